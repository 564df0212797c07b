//! Consumption store contract
//!
//! The store holds the yearly municipal table (measured rows plus the forecast
//! cache, told apart by [`RecordOrigin`]) and the daily regional table. It is
//! append-only: batches are inserted all-or-nothing and a key that already
//! exists rejects the whole batch.

pub mod memory;
#[cfg(feature = "db")]
pub mod pg;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::ops::RangeInclusive;
use std::sync::Arc;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::domain::{MunicipalityYearRecord, RecordOrigin, RegionDayRecord};

pub use memory::InMemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("store unavailable: {0}")]
    Backend(String),
}

#[cfg(feature = "db")]
impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate(db_err.message().to_string())
            }
            _ => StoreError::Backend(error.to_string()),
        }
    }
}

/// Equality and range predicates over the yearly municipal table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MunicipalityFilter {
    pub municipality_name: Option<String>,
    pub municipality_code: Option<String>,
    pub years: Option<RangeInclusive<i32>>,
    pub origin: Option<RecordOrigin>,
}

impl MunicipalityFilter {
    pub fn municipality(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            municipality_name: Some(name.into()),
            municipality_code: Some(code.into()),
            ..Self::default()
        }
    }

    pub fn years(mut self, years: RangeInclusive<i32>) -> Self {
        self.years = Some(years);
        self
    }

    pub fn origin(mut self, origin: RecordOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn matches(&self, rec: &MunicipalityYearRecord) -> bool {
        self.municipality_name
            .as_ref()
            .map_or(true, |n| *n == rec.municipality_name)
            && self
                .municipality_code
                .as_ref()
                .map_or(true, |c| *c == rec.municipality_code)
            && self.years.as_ref().map_or(true, |y| y.contains(&rec.year))
            && self.origin.map_or(true, |o| o == rec.origin)
    }
}

/// Equality and inclusive date-range predicates over the daily regional table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionDayFilter {
    pub region_name: Option<String>,
    pub region_code: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RegionDayFilter {
    pub fn region(name: impl Into<String>, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            region_name: Some(name.into()),
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    pub fn dates(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    pub fn matches(&self, rec: &RegionDayRecord) -> bool {
        self.region_name.as_ref().map_or(true, |n| *n == rec.region_name)
            && self.region_code.as_ref().map_or(true, |c| *c == rec.region_code)
            && self.from.map_or(true, |d| rec.date >= d)
            && self.to.map_or(true, |d| rec.date <= d)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsumptionStore: Send + Sync {
    /// Append measured and/or forecast yearly rows; returns the number stored
    async fn append_municipality_years(
        &self,
        records: &[MunicipalityYearRecord],
    ) -> Result<usize, StoreError>;

    /// Append daily regional rows; returns the number stored
    async fn append_region_days(&self, records: &[RegionDayRecord]) -> Result<usize, StoreError>;

    /// Rows ordered by (code, year)
    async fn municipality_years(
        &self,
        filter: &MunicipalityFilter,
    ) -> Result<Vec<MunicipalityYearRecord>, StoreError>;

    /// Rows ordered by (date, region code)
    async fn region_days(&self, filter: &RegionDayFilter) -> Result<Vec<RegionDayRecord>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Build the configured backend
pub async fn connect(cfg: &StoreConfig) -> anyhow::Result<Arc<dyn ConsumptionStore>> {
    match cfg.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        #[cfg(feature = "db")]
        "postgres" => Ok(Arc::new(pg::PgStore::connect(&cfg.url, cfg.max_connections).await?)),
        other => anyhow::bail!("unsupported store backend: {other}"),
    }
}
