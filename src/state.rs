use std::sync::Arc;

use crate::auth::TokenSigner;
use crate::config::AppConfig;
use crate::database::models::Entity;
use crate::database::{Repository, Store};
use crate::services::mailer::Mailer;

/// Shared handles passed to every handler through axum `State`
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub tokens: TokenSigner,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        let tokens = TokenSigner::new(&config.security.jwt_secret);
        Self {
            config: Arc::new(config),
            store,
            mailer,
            tokens,
        }
    }

    pub fn repo<T: Entity>(&self) -> Repository<T> {
        Repository::new(self.store.clone())
    }
}
