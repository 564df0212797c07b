use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};

use super::{ConsumptionStore, MunicipalityFilter, RegionDayFilter, StoreError};
use crate::domain::{MunicipalityYearRecord, RegionDayRecord};

/// Process-local store, used for tests and for running without a warehouse
#[derive(Default)]
pub struct InMemoryStore {
    yearly: RwLock<BTreeMap<(String, i32), MunicipalityYearRecord>>,
    // Keyed (date, region_code) so reads come out in date order.
    daily: RwLock<BTreeMap<(NaiveDate, String), RegionDayRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsumptionStore for InMemoryStore {
    async fn append_municipality_years(
        &self,
        records: &[MunicipalityYearRecord],
    ) -> Result<usize, StoreError> {
        let mut table = self.yearly.write();
        let mut batch = HashSet::with_capacity(records.len());
        for rec in records {
            let key = rec.key();
            if table.contains_key(&key) || !batch.insert(key) {
                return Err(StoreError::Duplicate(format!(
                    "municipality {} year {}",
                    rec.municipality_code, rec.year
                )));
            }
        }
        for rec in records {
            table.insert(rec.key(), rec.clone());
        }
        Ok(records.len())
    }

    async fn append_region_days(&self, records: &[RegionDayRecord]) -> Result<usize, StoreError> {
        let mut table = self.daily.write();
        let mut batch = HashSet::with_capacity(records.len());
        for rec in records {
            let key = (rec.date, rec.region_code.clone());
            if table.contains_key(&key) || !batch.insert(key) {
                return Err(StoreError::Duplicate(format!(
                    "region {} date {}",
                    rec.region_code, rec.date
                )));
            }
        }
        for rec in records {
            table.insert((rec.date, rec.region_code.clone()), rec.clone());
        }
        Ok(records.len())
    }

    async fn municipality_years(
        &self,
        filter: &MunicipalityFilter,
    ) -> Result<Vec<MunicipalityYearRecord>, StoreError> {
        Ok(self
            .yearly
            .read()
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn region_days(&self, filter: &RegionDayFilter) -> Result<Vec<RegionDayRecord>, StoreError> {
        Ok(self
            .daily
            .read()
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordOrigin;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_append_then_query_yearly() {
        let store = InMemoryStore::new();
        let stored = store
            .append_municipality_years(&[
                MunicipalityYearRecord::measured("Caen", "14118", 2022, 3.0),
                MunicipalityYearRecord::measured("Caen", "14118", 2021, 2.9),
                MunicipalityYearRecord::forecast("Caen", "14118", 2023, 3.1),
            ])
            .await
            .unwrap();
        assert_eq!(stored, 3);

        let all = store
            .municipality_years(&MunicipalityFilter::municipality("Caen", "14118"))
            .await
            .unwrap();
        let years: Vec<i32> = all.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2021, 2022, 2023]);

        let cached = store
            .municipality_years(&MunicipalityFilter::default().origin(RecordOrigin::Forecast))
            .await
            .unwrap();
        assert_eq!(cached.len(), 1);
    }

    #[tokio::test]
    async fn test_forecast_cannot_overwrite_measured_year() {
        let store = InMemoryStore::new();
        store
            .append_municipality_years(&[MunicipalityYearRecord::measured("Caen", "14118", 2022, 3.0)])
            .await
            .unwrap();

        let err = store
            .append_municipality_years(&[
                MunicipalityYearRecord::forecast("Caen", "14118", 2023, 3.1),
                MunicipalityYearRecord::forecast("Caen", "14118", 2022, 9.9),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        // Batch is all-or-nothing
        let rows = store
            .municipality_years(&MunicipalityFilter::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mean_residential_consumption_mwh, 3.0);
    }

    #[tokio::test]
    async fn test_duplicate_within_batch_is_rejected() {
        let store = InMemoryStore::new();
        let rec = RegionDayRecord::new("28", "Normandie", day(1), 3000.0);
        let err = store
            .append_region_days(&[rec.clone(), rec])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_region_days_ordered_by_date() {
        let store = InMemoryStore::new();
        store
            .append_region_days(&[
                RegionDayRecord::new("28", "Normandie", day(3), 3300.0),
                RegionDayRecord::new("28", "Normandie", day(1), 3100.0),
                RegionDayRecord::new("53", "Bretagne", day(2), 2800.0),
            ])
            .await
            .unwrap();

        let rows = store
            .region_days(&RegionDayFilter::region("Normandie", day(1), day(3)))
            .await
            .unwrap();
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(1), day(3)]);
    }
}
