//! Database adapters: Postgres via SeaORM, plus in-memory repositories.

mod connections;
mod memory;
mod postgres_base;

pub mod entity;
pub mod postgres_repo;

pub use connections::{DatabaseConfig, connect};
pub use memory::{InMemoryPostRepository, InMemoryStore, InMemoryUserRepository};
pub use postgres_repo::{PostgresPostRepository, PostgresUserRepository};
