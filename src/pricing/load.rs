//! Regional load: rolling mean of daily regional consumption

use chrono::{Duration, NaiveDate};
use std::sync::Arc;

use super::PricingError;
use crate::domain::RegionDayRecord;
use crate::store::{ConsumptionStore, RegionDayFilter};

pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Arithmetic mean of the daily figures; `None` for an empty slice
pub fn mean_consumption(records: &[RegionDayRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let total: f64 = records.iter().map(|r| r.mean_consumption_mwh).sum();
    Some(total / records.len() as f64)
}

#[derive(Clone)]
pub struct RegionalLoadEstimator {
    store: Arc<dyn ConsumptionStore>,
    window_days: u32,
}

impl RegionalLoadEstimator {
    pub fn new(store: Arc<dyn ConsumptionStore>, window_days: u32) -> Self {
        Self { store, window_days }
    }

    /// Mean over `[as_of - window_days, as_of]`, both ends included
    pub async fn rolling_mean(&self, region_name: &str, as_of: NaiveDate) -> Result<f64, PricingError> {
        let from = as_of - Duration::days(i64::from(self.window_days));
        let records = self
            .store
            .region_days(&RegionDayFilter::region(region_name, from, as_of))
            .await?;

        mean_consumption(&records).ok_or_else(|| PricingError::EmptyLoadWindow {
            region: region_name.to_string(),
            from,
            to: as_of,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store
            .append_region_days(&[
                // one day outside the window
                RegionDayRecord::new("28", "Normandie", date(2024, 2, 29), 99_999.0),
                RegionDayRecord::new("28", "Normandie", date(2024, 3, 1), 3000.0),
                RegionDayRecord::new("28", "Normandie", date(2024, 3, 15), 4000.0),
                RegionDayRecord::new("28", "Normandie", date(2024, 3, 31), 5000.0),
                RegionDayRecord::new("53", "Bretagne", date(2024, 3, 15), 1.0),
            ])
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_mean_of_empty_is_undefined() {
        assert_eq!(mean_consumption(&[]), None);
    }

    #[tokio::test]
    async fn test_window_includes_both_ends() {
        let estimator = RegionalLoadEstimator::new(seeded().await, DEFAULT_WINDOW_DAYS);
        let mean = estimator
            .rolling_mean("Normandie", date(2024, 3, 31))
            .await
            .unwrap();
        assert!((mean - 4000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_window_is_an_error_not_zero() {
        let estimator = RegionalLoadEstimator::new(seeded().await, DEFAULT_WINDOW_DAYS);
        let err = estimator
            .rolling_mean("Occitanie", date(2024, 3, 31))
            .await
            .unwrap_err();
        assert!(matches!(err, PricingError::EmptyLoadWindow { .. }));

        let err = estimator
            .rolling_mean("Normandie", date(2025, 1, 1))
            .await
            .unwrap_err();
        assert!(err.is_insufficient_data());
    }
}
