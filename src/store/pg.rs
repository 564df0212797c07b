//! Postgres-backed consumption store

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use super::{ConsumptionStore, MunicipalityFilter, RegionDayFilter, StoreError};
use crate::domain::{MunicipalityYearRecord, RecordOrigin, RegionDayRecord};

// Bind parameters per INSERT stay well under the Postgres limit of 65535.
const INSERT_CHUNK: usize = 1000;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS municipality_yearly_consumption (
        municipality_name TEXT NOT NULL,
        municipality_code TEXT NOT NULL,
        year INTEGER NOT NULL,
        mean_residential_consumption_mwh DOUBLE PRECISION NOT NULL,
        origin TEXT NOT NULL CHECK (origin IN ('measured', 'forecast')),
        inserted_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (municipality_code, year)
    )
    "#,
    r#"
    CREATE OR REPLACE VIEW municipality_forecast_cache AS
    SELECT municipality_name, municipality_code, year, mean_residential_consumption_mwh
    FROM municipality_yearly_consumption
    WHERE origin = 'forecast'
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS region_daily_consumption (
        region_code TEXT NOT NULL,
        region_name TEXT NOT NULL,
        date DATE NOT NULL,
        mean_consumption_mwh DOUBLE PRECISION NOT NULL,
        inserted_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (region_code, date)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS region_daily_consumption_name_date ON region_daily_consumption (region_name, date)",
];

#[derive(Debug, FromRow)]
struct YearRow {
    municipality_name: String,
    municipality_code: String,
    year: i32,
    mean_residential_consumption_mwh: f64,
    origin: String,
}

impl TryFrom<YearRow> for MunicipalityYearRecord {
    type Error = StoreError;

    fn try_from(row: YearRow) -> Result<Self, Self::Error> {
        Ok(Self {
            municipality_name: row.municipality_name,
            municipality_code: row.municipality_code,
            year: row.year,
            mean_residential_consumption_mwh: row.mean_residential_consumption_mwh,
            origin: row
                .origin
                .parse::<RecordOrigin>()
                .map_err(StoreError::Backend)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct DayRow {
    region_code: String,
    region_name: String,
    date: NaiveDate,
    mean_consumption_mwh: f64,
}

impl From<DayRow> for RegionDayRecord {
    fn from(row: DayRow) -> Self {
        Self {
            region_code: row.region_code,
            region_name: row.region_name,
            date: row.date,
            mean_consumption_mwh: row.mean_consumption_mwh,
        }
    }
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await
            .context("Failed to create database pool")?;

        for stmt in SCHEMA {
            sqlx::query(stmt)
                .execute(&pool)
                .await
                .context("Failed to create consumption schema")?;
        }

        info!("Postgres consumption store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl ConsumptionStore for PgStore {
    async fn append_municipality_years(
        &self,
        records: &[MunicipalityYearRecord],
    ) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for chunk in records.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO municipality_yearly_consumption \
                 (municipality_name, municipality_code, year, mean_residential_consumption_mwh, origin) ",
            );
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(r.municipality_name.clone())
                    .push_bind(r.municipality_code.clone())
                    .push_bind(r.year)
                    .push_bind(r.mean_residential_consumption_mwh)
                    .push_bind(r.origin.to_string());
            });
            qb.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!(records = records.len(), "appended yearly municipality rows");
        Ok(records.len())
    }

    async fn append_region_days(&self, records: &[RegionDayRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for chunk in records.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO region_daily_consumption \
                 (region_code, region_name, date, mean_consumption_mwh) ",
            );
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(r.region_code.clone())
                    .push_bind(r.region_name.clone())
                    .push_bind(r.date)
                    .push_bind(r.mean_consumption_mwh);
            });
            qb.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!(records = records.len(), "appended daily region rows");
        Ok(records.len())
    }

    async fn municipality_years(
        &self,
        filter: &MunicipalityFilter,
    ) -> Result<Vec<MunicipalityYearRecord>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT municipality_name, municipality_code, year, mean_residential_consumption_mwh, origin \
             FROM municipality_yearly_consumption WHERE TRUE",
        );
        if let Some(name) = &filter.municipality_name {
            qb.push(" AND municipality_name = ").push_bind(name.clone());
        }
        if let Some(code) = &filter.municipality_code {
            qb.push(" AND municipality_code = ").push_bind(code.clone());
        }
        if let Some(years) = &filter.years {
            qb.push(" AND year >= ").push_bind(*years.start());
            qb.push(" AND year <= ").push_bind(*years.end());
        }
        if let Some(origin) = filter.origin {
            qb.push(" AND origin = ").push_bind(origin.to_string());
        }
        qb.push(" ORDER BY municipality_code, year");

        qb.build_query_as::<YearRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(MunicipalityYearRecord::try_from)
            .collect()
    }

    async fn region_days(&self, filter: &RegionDayFilter) -> Result<Vec<RegionDayRecord>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT region_code, region_name, date, mean_consumption_mwh \
             FROM region_daily_consumption WHERE TRUE",
        );
        if let Some(name) = &filter.region_name {
            qb.push(" AND region_name = ").push_bind(name.clone());
        }
        if let Some(code) = &filter.region_code {
            qb.push(" AND region_code = ").push_bind(code.clone());
        }
        if let Some(from) = filter.from {
            qb.push(" AND date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND date <= ").push_bind(to);
        }
        qb.push(" ORDER BY date, region_code");

        let rows = qb.build_query_as::<DayRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(RegionDayRecord::from).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
