//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{PasswordService, PostRepository, TokenService, UserRepository};
use quill_infra::auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
use quill_infra::database::{
    self, InMemoryStore, PostgresPostRepository, PostgresUserRepository,
};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        if let Some(db_config) = &config.database {
            match database::connect(db_config).await {
                Ok(conn) => {
                    let state = Self {
                        users: Arc::new(PostgresUserRepository::new(conn.clone())),
                        posts: Arc::new(PostgresPostRepository::new(conn)),
                        tokens: Arc::new(JwtTokenService::new(config.jwt.clone())),
                        passwords: Arc::new(Argon2PasswordService::new()),
                    };
                    tracing::info!("Application state initialized");
                    return state;
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory fallback.",
                        e
                    );
                }
            }
        } else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        }

        Self::in_memory(config.jwt.clone())
    }

    /// State backed entirely by in-memory repositories. Data does not
    /// survive a restart.
    pub fn in_memory(jwt: JwtConfig) -> Self {
        let store = InMemoryStore::new();

        Self {
            users: Arc::new(store.users()),
            posts: Arc::new(store.posts()),
            tokens: Arc::new(JwtTokenService::new(jwt)),
            passwords: Arc::new(Argon2PasswordService::new()),
        }
    }
}
