use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Store;
use crate::services::{AccountService, BoardService};

/// Shared handles for every request handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub accounts: AccountService,
    pub boards: BoardService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let accounts = AccountService::new(store.clone(), &config.security);
        let boards = BoardService::new(store.clone());
        Self {
            config: Arc::new(config),
            store,
            accounts,
            boards,
        }
    }
}
