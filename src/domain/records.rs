use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a yearly figure was measured or projected by the trend forecaster
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RecordOrigin {
    Measured,
    Forecast,
}

impl fmt::Display for RecordOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured => write!(f, "measured"),
            Self::Forecast => write!(f, "forecast"),
        }
    }
}

impl std::str::FromStr for RecordOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "measured" => Ok(Self::Measured),
            "forecast" => Ok(Self::Forecast),
            other => Err(format!("unknown record origin: {other}")),
        }
    }
}

/// Mean residential consumption of one municipality for one year.
///
/// Unique per (`municipality_code`, `year`) across both origins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MunicipalityYearRecord {
    pub municipality_name: String,
    pub municipality_code: String,
    pub year: i32,
    pub mean_residential_consumption_mwh: f64,
    pub origin: RecordOrigin,
}

impl MunicipalityYearRecord {
    pub fn measured(name: impl Into<String>, code: impl Into<String>, year: i32, mwh: f64) -> Self {
        Self {
            municipality_name: name.into(),
            municipality_code: code.into(),
            year,
            mean_residential_consumption_mwh: mwh,
            origin: RecordOrigin::Measured,
        }
    }

    pub fn forecast(name: impl Into<String>, code: impl Into<String>, year: i32, mwh: f64) -> Self {
        Self {
            origin: RecordOrigin::Forecast,
            ..Self::measured(name, code, year, mwh)
        }
    }

    pub fn key(&self) -> (String, i32) {
        (self.municipality_code.clone(), self.year)
    }
}

/// Mean consumption of one region for one calendar day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionDayRecord {
    pub region_code: String,
    pub region_name: String,
    pub date: NaiveDate,
    pub mean_consumption_mwh: f64,
}

impl RegionDayRecord {
    pub fn new(
        region_code: impl Into<String>,
        region_name: impl Into<String>,
        date: NaiveDate,
        mean_consumption_mwh: f64,
    ) -> Self {
        Self {
            region_code: region_code.into(),
            region_name: region_name.into(),
            date,
            mean_consumption_mwh,
        }
    }

    pub fn key(&self) -> (String, NaiveDate) {
        (self.region_code.clone(), self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_record_keeps_identity() {
        let rec = MunicipalityYearRecord::forecast("Brageac", "15024", 2025, 4.2);
        assert_eq!(rec.origin, RecordOrigin::Forecast);
        assert_eq!(rec.key(), ("15024".to_string(), 2025));
        assert_eq!(rec.municipality_name, "Brageac");
    }

    #[test]
    fn test_origin_roundtrip_through_str() {
        for origin in [RecordOrigin::Measured, RecordOrigin::Forecast] {
            let parsed: RecordOrigin = origin.to_string().parse().unwrap();
            assert_eq!(parsed, origin);
        }
        assert!("projected".parse::<RecordOrigin>().is_err());
    }

    #[test]
    fn test_origin_serializes_lowercase() {
        let json = serde_json::to_string(&RecordOrigin::Measured).unwrap();
        assert_eq!(json, "\"measured\"");
    }
}
