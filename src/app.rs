use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::ingestion::OpenDataClient;
use crate::pricing::PricingService;
use crate::store::{self, ConsumptionStore};

/// Explicitly constructed collaborators shared by handlers and jobs
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub store: Arc<dyn ConsumptionStore>,
    pub pricing: PricingService,
    pub open_data: OpenDataClient,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self> {
        let store = store::connect(&cfg.store).await?;
        Self::with_store(cfg, store)
    }

    /// Wire the state around an existing store
    pub fn with_store(cfg: Config, store: Arc<dyn ConsumptionStore>) -> Result<Self> {
        let pricing = PricingService::new(
            store.clone(),
            cfg.pricing.tariff(),
            cfg.pricing.load_window_days,
        );
        let open_data = OpenDataClient::new(
            cfg.ingestion.municipal_url.clone(),
            cfg.ingestion.regional_url.clone(),
            Duration::from_secs(cfg.ingestion.http_timeout_seconds),
        )?;

        Ok(Self {
            cfg: Arc::new(cfg),
            store,
            pricing,
            open_data,
        })
    }
}
