pub mod banners;
pub mod categories;
pub mod health;
pub mod helpers;
pub mod import;
pub mod offers;
pub mod orders;
pub mod products;
pub mod reports;
mod router;
pub mod settings;
pub mod types;
pub mod uploads;
pub mod users;

pub use router::create_router;

// Re-export AppState for convenience
pub use crate::state::AppState;
