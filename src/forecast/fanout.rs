//! Per-municipality forecasting over a whole history batch

use anyhow::{Context, Result};
use futures::{stream, StreamExt, TryStreamExt};
use itertools::Itertools;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::trend::{self, TrendForecast};
use crate::domain::MunicipalityYearRecord;

/// Forecast of one municipality together with its identity
#[derive(Debug, Clone, PartialEq)]
pub struct MunicipalityForecast {
    pub municipality_name: String,
    pub municipality_code: String,
    pub forecast: TrendForecast,
}

impl MunicipalityForecast {
    /// Defined projections as storable forecast records
    pub fn records(&self) -> Vec<MunicipalityYearRecord> {
        match &self.forecast {
            TrendForecast::Projected(values) => values
                .iter()
                .map(|(&year, &mwh)| {
                    MunicipalityYearRecord::forecast(
                        self.municipality_name.clone(),
                        self.municipality_code.clone(),
                        year,
                        mwh,
                    )
                })
                .collect(),
            TrendForecast::Undefined { .. } => Vec::new(),
        }
    }
}

/// Years from the one after the latest measurement through `current_year + 1`
pub fn default_target_years(history: &[MunicipalityYearRecord], current_year: i32) -> BTreeSet<i32> {
    match history.iter().map(|r| r.year).max() {
        Some(last) => ((last + 1)..=(current_year + 1)).collect(),
        None => BTreeSet::new(),
    }
}

/// Fit every municipality of `history` independently, with at most
/// `max_concurrency` fits in flight. Years a municipality has already measured
/// are removed from its targets. Output is ordered by municipality code.
pub async fn forecast_municipalities(
    history: &[MunicipalityYearRecord],
    target_years: &BTreeSet<i32>,
    max_concurrency: usize,
) -> Result<Vec<MunicipalityForecast>> {
    let groups: Vec<(String, String, Vec<(i32, f64)>)> = history
        .iter()
        .into_group_map_by(|r| r.municipality_code.clone())
        .into_iter()
        .map(|(code, records)| {
            let name = records[0].municipality_name.clone();
            let series = records
                .iter()
                .map(|r| (r.year, r.mean_residential_consumption_mwh))
                .collect();
            (code, name, series)
        })
        .collect();

    debug!(municipalities = groups.len(), targets = ?target_years, "forecasting municipalities");

    let mut out: Vec<MunicipalityForecast> = stream::iter(groups)
        .map(|(code, name, series)| {
            let measured: BTreeSet<i32> = series.iter().map(|(y, _)| *y).collect();
            let targets: BTreeSet<i32> = target_years.difference(&measured).copied().collect();
            tokio::task::spawn_blocking(move || MunicipalityForecast {
                forecast: trend::forecast(&series, &targets),
                municipality_name: name,
                municipality_code: code,
            })
        })
        .buffer_unordered(max_concurrency.max(1))
        .map(|joined| joined.context("forecast worker panicked"))
        .try_collect()
        .await?;

    out.sort_by(|a, b| a.municipality_code.cmp(&b.municipality_code));

    let mut undefined = 0;
    for f in out.iter().filter(|f| !f.forecast.is_defined()) {
        undefined += 1;
        debug!(
            municipality_code = %f.municipality_code,
            years = ?f.forecast.years(),
            "forecast undefined"
        );
    }
    if undefined > 0 {
        warn!(undefined, total = out.len(), "some municipalities could not be forecast");
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordOrigin;
    use crate::forecast::FitFailure;

    fn history() -> Vec<MunicipalityYearRecord> {
        vec![
            MunicipalityYearRecord::measured("Brageac", "15024", 2020, 4.0),
            MunicipalityYearRecord::measured("Brageac", "15024", 2021, 4.5),
            MunicipalityYearRecord::measured("Brageac", "15024", 2022, 5.0),
            MunicipalityYearRecord::measured("Caen", "14118", 2020, 3.0),
            MunicipalityYearRecord::measured("Caen", "14118", 2021, 3.0),
            MunicipalityYearRecord::measured("Caen", "14118", 2022, 3.0),
            MunicipalityYearRecord::measured("Anost", "71009", 2022, 6.0),
        ]
    }

    #[test]
    fn test_default_target_years_reach_next_year() {
        let targets = default_target_years(&history(), 2025);
        assert_eq!(targets, BTreeSet::from([2023, 2024, 2025, 2026]));
        assert!(default_target_years(&[], 2025).is_empty());
    }

    #[tokio::test]
    async fn test_each_municipality_is_fitted_independently() {
        let targets = BTreeSet::from([2023, 2024]);
        let out = forecast_municipalities(&history(), &targets, 2).await.unwrap();

        let codes: Vec<&str> = out.iter().map(|f| f.municipality_code.as_str()).collect();
        assert_eq!(codes, vec!["14118", "15024", "71009"]);

        let caen = &out[0];
        assert!((caen.forecast.value(2024).unwrap() - 3.0).abs() < 1e-9);

        let brageac = &out[1];
        assert!((brageac.forecast.value(2023).unwrap() - 5.5).abs() < 1e-9);

        let anost = &out[2];
        assert_eq!(
            anost.forecast,
            TrendForecast::Undefined {
                years: targets.clone(),
                reason: FitFailure::SingleDistinctYear,
            }
        );
        assert!(anost.records().is_empty());
    }

    #[tokio::test]
    async fn test_measured_years_are_never_forecast() {
        let targets = BTreeSet::from([2022, 2023]);
        let out = forecast_municipalities(&history(), &targets, 4).await.unwrap();

        for f in &out {
            assert!(!f.forecast.years().contains(&2022));
        }
        let records = out[1].records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].year, 2023);
        assert_eq!(records[0].origin, RecordOrigin::Forecast);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_progresses() {
        let targets = BTreeSet::from([2023]);
        let out = forecast_municipalities(&history(), &targets, 0).await.unwrap();
        assert_eq!(out.len(), 3);
    }
}
