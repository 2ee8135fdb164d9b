use crate::auth::AuthService;
use crate::config::Environment;
use crate::db::Database;
use crate::media::MediaClient;
use std::time::Instant;

/// Application state shared across all HTTP handlers.
///
/// Wrapped in `Arc` and handed to handlers through Axum's State
/// extraction; every dependency is constructed once at startup and
/// injected here rather than reached through globals.
#[derive(Clone)]
pub struct AppState {
    /// Document-store handle with typed collections
    pub db: Database,

    /// Image-host client; `None` when credentials were not configured,
    /// in which case upload endpoints answer 503
    pub media: Option<MediaClient>,

    /// JWT authentication service for token generation and validation
    pub auth_service: AuthService,

    /// Environment label reported by the health endpoint
    pub environment: Environment,

    /// Process start instant, used to compute health-check uptime
    pub started_at: Instant,
}
