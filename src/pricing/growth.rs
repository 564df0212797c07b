//! Municipal growth coefficient (alpha)

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::PricingError;
use crate::store::{ConsumptionStore, MunicipalityFilter};

/// Shrinking consumption is priced like flat consumption.
pub const ALPHA_FLOOR: f64 = 1.0;
/// Caps extrapolation blow-up on short series.
pub const ALPHA_CAP: f64 = 1.3;

/// Ratio of next-year to current-year consumption, clamped to
/// [`ALPHA_FLOOR`, `ALPHA_CAP`]. A missing year and an undefined (`None`) year
/// are both insufficient data.
pub fn compute_alpha(
    forecast: &BTreeMap<i32, Option<f64>>,
    current_year: i32,
) -> Result<f64, PricingError> {
    let value = |year: i32| {
        forecast
            .get(&year)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
            .ok_or(PricingError::UndefinedForecast { year })
    };

    let current = value(current_year)?;
    let next = value(current_year + 1)?;

    if current == 0.0 {
        return Err(PricingError::UndefinedGrowth { year: current_year });
    }

    let raw = next / current;
    Ok(raw.clamp(ALPHA_FLOOR, ALPHA_CAP))
}

/// Reads a municipality's yearly figures from the store and derives alpha
#[derive(Clone)]
pub struct GrowthCalculator {
    store: Arc<dyn ConsumptionStore>,
}

impl GrowthCalculator {
    pub fn new(store: Arc<dyn ConsumptionStore>) -> Self {
        Self { store }
    }

    pub async fn alpha_for(
        &self,
        municipality_name: &str,
        municipality_code: &str,
        current_year: i32,
    ) -> Result<f64, PricingError> {
        let filter = MunicipalityFilter::municipality(municipality_name, municipality_code)
            .years(current_year..=current_year + 1);
        let records = self.store.municipality_years(&filter).await?;

        let mut forecast: BTreeMap<i32, Option<f64>> =
            [(current_year, None), (current_year + 1, None)].into();
        for rec in records {
            forecast.insert(rec.year, Some(rec.mean_residential_consumption_mwh));
        }

        let alpha = compute_alpha(&forecast, current_year)?;
        debug!(municipality_code, current_year, alpha, "growth coefficient");
        Ok(alpha)
    }
}
