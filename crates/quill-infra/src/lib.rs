//! # Quill Infrastructure
//!
//! Concrete implementations of the ports defined in `quill-core`:
//! Postgres repositories via SeaORM, in-memory repositories for tests and
//! database-less development, Argon2 password hashing and JWT tokens.

pub mod auth;
pub mod database;

pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use database::{DatabaseConfig, InMemoryStore};
