use crate::{catalog::Catalog, config::Config, metrics, session::SessionManager};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Videos, campaigns and settings
    pub catalog: Catalog,
    /// Live player sessions
    pub sessions: SessionManager,
    /// Prometheus handle for `/metrics`
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl AppState {
    /// Load the catalog named by the config (or the in-memory demo catalog)
    /// and wire up shared services.
    pub async fn new(config: Config) -> crate::error::Result<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::load(path).await?,
            None => {
                info!("No CATALOG_PATH set, serving the in-memory demo catalog");
                Catalog::demo()
            }
        };
        Ok(Self::with_catalog(config, catalog))
    }

    pub fn with_catalog(config: Config, catalog: Catalog) -> Self {
        let sessions = SessionManager::new(config.session_ttl(), config.ad_tick_period());
        Self {
            config: Arc::new(config),
            catalog,
            sessions,
            metrics: metrics::init(),
            started_at: Instant::now(),
        }
    }
}
