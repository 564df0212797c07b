use chrono::{Datelike, NaiveDate};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{engine, GrowthCalculator, PricingError, RegionalLoadEstimator, Tariff};
use crate::domain::{PriceQuote, PricingRequest};
use crate::store::ConsumptionStore;

/// Glues the store-backed estimators to the pure pricing engine
#[derive(Clone)]
pub struct PricingService {
    load: RegionalLoadEstimator,
    growth: GrowthCalculator,
    tariff: Tariff,
}

impl PricingService {
    pub fn new(store: Arc<dyn ConsumptionStore>, tariff: Tariff, window_days: u32) -> Self {
        Self {
            load: RegionalLoadEstimator::new(store.clone(), window_days),
            growth: GrowthCalculator::new(store),
            tariff,
        }
    }

    /// Price `req` as of `as_of`. Fails as a whole if either input is missing.
    pub async fn quote(&self, req: &PricingRequest, as_of: NaiveDate) -> Result<PriceQuote, PricingError> {
        let result = self.try_quote(req, as_of).await;
        match &result {
            Err(e) if e.is_insufficient_data() => warn!(
                region = %req.region_name,
                municipality_code = %req.municipality_code,
                error = %e,
                "pricing unavailable"
            ),
            Err(e) => error!(
                region = %req.region_name,
                municipality_code = %req.municipality_code,
                error = %e,
                "pricing failed"
            ),
            Ok(_) => {}
        }
        result
    }

    async fn try_quote(&self, req: &PricingRequest, as_of: NaiveDate) -> Result<PriceQuote, PricingError> {
        let (regional_load_mean, alpha) = tokio::try_join!(
            self.load.rolling_mean(&req.region_name, as_of),
            self.growth
                .alpha_for(&req.municipality_name, &req.municipality_code, as_of.year()),
        )?;

        let quote = engine::price(&req.household(), alpha, regional_load_mean, &self.tariff)?;
        info!(
            region = %req.region_name,
            municipality_code = %req.municipality_code,
            alpha,
            regional_load_mean,
            price = quote.price,
            "price quoted"
        );
        Ok(quote)
    }
}
