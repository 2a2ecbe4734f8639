//! # Quill API Server
//!
//! Library surface of the API server binary, exposed so integration tests
//! can assemble the app the same way `main` does.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod state;
pub mod telemetry;
