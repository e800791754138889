use std::sync::Arc;

use crate::config::Config;
use crate::utils::{mail::Mailer, token::TokenService};
use axum::extract::FromRef;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub tokens: TokenService,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Builds the state, deriving the token service from the configured secret.
    pub fn new(pool: SqlitePool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        let tokens = TokenService::new(&config.secret_key);
        Self {
            pool,
            config,
            tokens,
            mailer,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Mailer> {
    fn from_ref(state: &AppState) -> Self {
        state.mailer.clone()
    }
}
