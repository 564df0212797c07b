//! Yearly municipal job: history, trend forecasts, append

use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Instant;
use tracing::{info, warn};

use super::source::{OpenDataClient, RawMunicipalRow};
use super::IngestionReport;
use crate::config::ForecastConfig;
use crate::domain::MunicipalityYearRecord;
use crate::forecast::{default_target_years, forecast_municipalities};
use crate::store::{ConsumptionStore, MunicipalityFilter};

const RESIDENTIAL: &str = "RESIDENTIEL";

/// Mean consumption per (code, year) over usable residential rows. A code
/// keeps the first name it was seen with.
pub fn aggregate_municipal_rows(rows: &[RawMunicipalRow]) -> Vec<MunicipalityYearRecord> {
    let mut groups: BTreeMap<(String, i32), (String, f64, usize)> = BTreeMap::new();
    for row in rows {
        if row
            .code_grand_secteur
            .as_deref()
            .is_some_and(|s| s != RESIDENTIAL)
        {
            continue;
        }
        let (Some(name), Some(code), Some(year), Some(mwh)) = (
            row.nom_commune.as_ref(),
            row.code_commune.as_ref(),
            row.annee,
            row.conso_moyenne_mwh,
        ) else {
            continue;
        };
        if !mwh.is_finite() {
            continue;
        }
        let entry = groups
            .entry((code.clone(), year))
            .or_insert_with(|| (name.clone(), 0.0, 0));
        entry.1 += mwh;
        entry.2 += 1;
    }

    groups
        .into_iter()
        .map(|((code, year), (name, sum, n))| {
            MunicipalityYearRecord::measured(name, code, year, sum / n as f64)
        })
        .collect()
}

/// Fetch history, forecast the target years and append everything the store
/// does not hold yet.
pub async fn run_municipal_job(
    store: &dyn ConsumptionStore,
    source: &OpenDataClient,
    history_years: &[i32],
    forecast_cfg: &ForecastConfig,
    current_year: i32,
) -> Result<IngestionReport> {
    let started = Instant::now();
    info!(?history_years, "municipal ingestion started");

    let rows = source.fetch_municipal(history_years).await?;
    let history = aggregate_municipal_rows(&rows);

    let targets: BTreeSet<i32> = match &forecast_cfg.target_years {
        Some(years) => years.iter().copied().collect(),
        None => default_target_years(&history, current_year),
    };
    let forecasts =
        forecast_municipalities(&history, &targets, forecast_cfg.max_concurrency).await?;
    let undefined_forecasts = forecasts
        .iter()
        .filter(|f| !f.forecast.is_defined())
        .count();

    let existing: HashSet<(String, i32)> = store
        .municipality_years(&MunicipalityFilter::default())
        .await?
        .iter()
        .map(MunicipalityYearRecord::key)
        .collect();

    let candidates: Vec<MunicipalityYearRecord> = history
        .into_iter()
        .chain(forecasts.iter().flat_map(|f| f.records()))
        .collect();
    let total = candidates.len();
    let batch: Vec<MunicipalityYearRecord> = candidates
        .into_iter()
        .filter(|r| !existing.contains(&r.key()))
        .collect();

    let stored = store.append_municipality_years(&batch).await?;
    let report = IngestionReport {
        fetched_rows: rows.len(),
        stored,
        skipped_existing: total - batch.len(),
        undefined_forecasts,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };

    if undefined_forecasts > 0 {
        warn!(undefined_forecasts, "municipalities left without forecast");
    }
    info!(
        fetched_rows = report.fetched_rows,
        stored = report.stored,
        skipped_existing = report.skipped_existing,
        elapsed_ms = report.elapsed_ms,
        "municipal ingestion finished"
    );
    Ok(report)
}
