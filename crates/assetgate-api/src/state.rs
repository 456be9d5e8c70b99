//! # Application State
//!
//! Shared state passed to all route handlers via the `State` extractor.
//! Cloning is cheap: everything sits behind an `Arc`.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::gateway::AssetGateway;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<AssetGateway>,
}

impl AppState {
    pub fn new(config: AppConfig, gateway: AssetGateway) -> Self {
        Self {
            config: Arc::new(config),
            gateway: Arc::new(gateway),
        }
    }
}
