//! Linear trend forecasting of yearly consumption
//!
//! A municipality's yearly series is reduced to one mean value per year, fitted
//! with an ordinary least-squares line (value on year) and the line is evaluated
//! at each requested year. Projected values are not clamped: short or steep
//! series can extrapolate to negative consumption.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Why a series could not be fitted
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitFailure {
    #[error("series is empty")]
    EmptySeries,
    #[error("series has fewer than two distinct years")]
    SingleDistinctYear,
    #[error("series produced a non-finite fit")]
    NonFinite,
}

/// Fitted line `value = intercept + slope * year`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearTrend {
    pub fn at(&self, year: i32) -> f64 {
        self.intercept + self.slope * f64::from(year)
    }
}

/// Outcome of a forecast run. Callers must handle both arms; an undefined
/// forecast is missing data, never zero consumption.
#[derive(Debug, Clone, PartialEq)]
pub enum TrendForecast {
    Projected(BTreeMap<i32, f64>),
    Undefined {
        years: BTreeSet<i32>,
        reason: FitFailure,
    },
}

impl TrendForecast {
    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Projected(_))
    }

    /// Projected value for `year`, `None` when undefined or not requested
    pub fn value(&self, year: i32) -> Option<f64> {
        match self {
            Self::Projected(values) => values.get(&year).copied(),
            Self::Undefined { .. } => None,
        }
    }

    pub fn years(&self) -> BTreeSet<i32> {
        match self {
            Self::Projected(values) => values.keys().copied().collect(),
            Self::Undefined { years, .. } => years.clone(),
        }
    }
}

/// Collapse duplicate years to their mean, ordered by year
pub fn aggregate_by_year(series: &[(i32, f64)]) -> Vec<(i32, f64)> {
    let mut sums: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for &(year, value) in series {
        let entry = sums.entry(year).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(year, (sum, n))| (year, sum / n as f64))
        .collect()
}

/// Ordinary least squares over an already aggregated series
pub fn fit_linear_trend(series: &[(i32, f64)]) -> Result<LinearTrend, FitFailure> {
    if series.is_empty() {
        return Err(FitFailure::EmptySeries);
    }
    if series.iter().any(|(_, v)| !v.is_finite()) {
        return Err(FitFailure::NonFinite);
    }

    let n = series.len() as f64;
    let mean_x = series.iter().map(|(x, _)| f64::from(*x)).sum::<f64>() / n;
    let mean_y = series.iter().map(|(_, y)| *y).sum::<f64>() / n;

    // Centering on the mean year keeps the sums small for calendar years.
    let (sxx, sxy) = series.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        let dx = f64::from(*x) - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });

    if sxx == 0.0 {
        return Err(FitFailure::SingleDistinctYear);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(FitFailure::NonFinite);
    }

    Ok(LinearTrend { slope, intercept })
}

/// Project `series` onto `target_years`. Pure; never panics on bad input.
pub fn forecast(series: &[(i32, f64)], target_years: &BTreeSet<i32>) -> TrendForecast {
    let aggregated = aggregate_by_year(series);
    match fit_linear_trend(&aggregated) {
        Ok(trend) => {
            let values: BTreeMap<i32, f64> = target_years
                .iter()
                .map(|&year| (year, trend.at(year)))
                .collect();
            if values.values().all(|v| v.is_finite()) {
                TrendForecast::Projected(values)
            } else {
                TrendForecast::Undefined {
                    years: target_years.clone(),
                    reason: FitFailure::NonFinite,
                }
            }
        }
        Err(reason) => TrendForecast::Undefined {
            years: target_years.clone(),
            reason,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn years(ys: &[i32]) -> BTreeSet<i32> {
        ys.iter().copied().collect()
    }

    #[test]
    fn test_exact_line_is_recovered() {
        let series = [(2020, 10.0), (2021, 12.0), (2022, 14.0)];
        let out = forecast(&series, &years(&[2023, 2024, 2025]));

        assert!(out.is_defined());
        assert!((out.value(2023).unwrap() - 16.0).abs() < 1e-9);
        assert!((out.value(2024).unwrap() - 18.0).abs() < 1e-9);
        assert!((out.value(2025).unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_noisy_series_matches_least_squares() {
        // y = 1, 2, 2 on x = 0, 1, 2 -> slope 0.5, intercept 7/6 (in centered x)
        let series = [(2020, 1.0), (2021, 2.0), (2022, 2.0)];
        let trend = fit_linear_trend(&series).unwrap();
        assert!((trend.slope - 0.5).abs() < 1e-12);
        assert!((trend.at(2020) - 7.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_years_are_averaged_before_fitting() {
        let raw = [(2020, 8.0), (2020, 12.0), (2021, 12.0), (2022, 14.0)];
        assert_eq!(aggregate_by_year(&raw), vec![(2020, 10.0), (2021, 12.0), (2022, 14.0)]);

        let out = forecast(&raw, &years(&[2023]));
        assert!((out.value(2023).unwrap() - 16.0).abs() < 1e-9);
    }

    #[rstest]
    #[case::empty(&[], FitFailure::EmptySeries)]
    #[case::single_point(&[(2022, 5.0)], FitFailure::SingleDistinctYear)]
    #[case::same_year_twice(&[(2022, 5.0), (2022, 7.0)], FitFailure::SingleDistinctYear)]
    #[case::nan_value(&[(2021, f64::NAN), (2022, 7.0)], FitFailure::NonFinite)]
    fn test_unfittable_series_is_undefined(
        #[case] series: &[(i32, f64)],
        #[case] expected: FitFailure,
    ) {
        let target = years(&[2023, 2024]);
        let out = forecast(series, &target);

        match &out {
            TrendForecast::Undefined { years, reason } => {
                assert_eq!(*reason, expected);
                assert_eq!(years, &target);
            }
            TrendForecast::Projected(_) => panic!("expected undefined forecast"),
        }
        assert_eq!(out.value(2023), None);
        assert_eq!(out.value(2024), None);
    }

    #[test]
    fn test_decline_extrapolates_below_zero() {
        let series = [(2020, 2.0), (2021, 1.0)];
        let out = forecast(&series, &years(&[2024]));
        assert!((out.value(2024).unwrap() + 2.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_forecast_is_deterministic(
            values in proptest::collection::vec(0.0f64..50.0, 2..8),
            start in 2000i32..2020,
        ) {
            let series: Vec<(i32, f64)> = values
                .iter()
                .enumerate()
                .map(|(i, v)| (start + i as i32, *v))
                .collect();
            let target = years(&[2030, 2031]);
            let first = forecast(&series, &target);
            let second = forecast(&series, &target);
            prop_assert!(first.is_defined());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_single_year_never_yields_zero(value in -10.0f64..10.0, n in 1usize..5) {
            let series = vec![(2022, value); n];
            let out = forecast(&series, &years(&[2023]));
            prop_assert!(!out.is_defined());
            prop_assert_eq!(out.value(2023), None);
        }
    }
}
