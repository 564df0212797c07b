//! Daily regional job: previous day's regional consumption, one row per region

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::info;

use super::source::{OpenDataClient, RawRegionalRow};
use super::IngestionReport;
use crate::domain::RegionDayRecord;
use crate::store::{ConsumptionStore, RegionDayFilter};

/// Mean of the intraday readings per (date, region code), rounded to whole
/// MWh. A code keeps the first label it was seen with. Groups with no
/// reading are dropped.
pub fn aggregate_regional_rows(rows: &[RawRegionalRow]) -> Vec<RegionDayRecord> {
    let mut groups: BTreeMap<(NaiveDate, String), (String, f64, usize)> = BTreeMap::new();
    for row in rows {
        let (Some(code), Some(name), Some(date), Some(value)) = (
            row.code_insee_region.as_ref(),
            row.libelle_region.as_ref(),
            row.date,
            row.consommation,
        ) else {
            continue;
        };
        if !value.is_finite() {
            continue;
        }
        let entry = groups
            .entry((date, code.clone()))
            .or_insert_with(|| (name.clone(), 0.0, 0));
        entry.1 += value;
        entry.2 += 1;
    }

    groups
        .into_iter()
        .map(|((date, code), (name, sum, n))| {
            RegionDayRecord::new(code, name, date, (sum / n as f64).round_ties_even())
        })
        .collect()
}

/// Load the day before `run_date`
pub async fn run_regional_job(
    store: &dyn ConsumptionStore,
    source: &OpenDataClient,
    run_date: NaiveDate,
) -> Result<IngestionReport> {
    let started = Instant::now();
    let day = run_date - Duration::days(1);
    info!(%day, "regional ingestion started");

    let rows = source.fetch_regional(day).await?;
    let records = aggregate_regional_rows(&rows);

    let existing: HashSet<(String, NaiveDate)> = store
        .region_days(&RegionDayFilter::dates(day, day))
        .await?
        .iter()
        .map(RegionDayRecord::key)
        .collect();
    let total = records.len();
    let batch: Vec<RegionDayRecord> = records
        .into_iter()
        .filter(|r| !existing.contains(&r.key()))
        .collect();

    let stored = store.append_region_days(&batch).await?;
    let report = IngestionReport {
        fetched_rows: rows.len(),
        stored,
        skipped_existing: total - batch.len(),
        undefined_forecasts: 0,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        %day,
        fetched_rows = report.fetched_rows,
        stored = report.stored,
        skipped_existing = report.skipped_existing,
        "regional ingestion finished"
    );
    Ok(report)
}
