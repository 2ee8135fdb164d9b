//! Savora - REST API backend for a catering storefront.
//!
//! The binary in `main.rs` wires configuration, the document store, the
//! image-host client and the HTTP router together; everything is exposed
//! as a library so integration tests can build the same router with
//! injected dependencies.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;
