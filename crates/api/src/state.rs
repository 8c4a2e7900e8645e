use kilog_metrics::MetricsService;
use kilog_models::Config;
use kilog_store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
    pub metrics: Arc<MetricsService>,
}

impl AppState {
    pub fn new(config: Config, store: Store, metrics: Arc<MetricsService>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            metrics,
        }
    }
}
