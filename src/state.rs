use crate::config::AppConfig;
use crate::services::store_actor::StoreHandle;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: StoreHandle,
    pub config: Arc<AppConfig>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, store: StoreHandle) -> Self {
        Self {
            store,
            config: Arc::new(config),
            start_time: chrono::Utc::now(),
        }
    }
}
