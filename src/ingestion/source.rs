//! Open-data HTTP sources for municipal and regional consumption

use anyhow::{Context, Result};
use chrono::NaiveDate;
use itertools::Itertools;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::debug;

/// One row of the municipal consumption-by-sector export
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawMunicipalRow {
    pub nom_commune: Option<String>,
    pub code_commune: Option<String>,
    #[serde(default, deserialize_with = "flexible_year")]
    pub annee: Option<i32>,
    pub conso_moyenne_mwh: Option<f64>,
    #[serde(default)]
    pub code_grand_secteur: Option<String>,
}

/// One (half-)hourly row of the regional real-time consumption export
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawRegionalRow {
    pub code_insee_region: Option<String>,
    pub libelle_region: Option<String>,
    pub date: Option<NaiveDate>,
    pub consommation: Option<f64>,
}

// The export renders years either as 2022 or as "2022" / "2022-01-01".
fn flexible_year<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i32),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(d)? {
        Some(Raw::Number(y)) => Some(y),
        Some(Raw::Text(s)) => s.get(..4).and_then(|y| y.parse().ok()),
        None => None,
    })
}

#[derive(Clone)]
pub struct OpenDataClient {
    client: reqwest::Client,
    municipal_url: String,
    regional_url: String,
}

impl OpenDataClient {
    pub fn new(municipal_url: String, regional_url: String, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("household-tariff/0.1"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            municipal_url,
            regional_url,
        })
    }

    /// Residential rows for the given years
    pub async fn fetch_municipal(&self, years: &[i32]) -> Result<Vec<RawMunicipalRow>> {
        let years_clause = years.iter().map(|y| format!("annee=date'{y}'")).join(" OR ");
        let where_clause = format!("({years_clause}) AND code_grand_secteur='RESIDENTIEL'");
        let params = [
            ("limit", "-1"),
            ("timezone", "UTC"),
            ("use_labels", "false"),
            ("select", "nom_commune, code_commune, conso_moyenne_mwh, annee, code_grand_secteur"),
            ("where", where_clause.as_str()),
        ];

        let rows: Vec<RawMunicipalRow> = self.get_json(&self.municipal_url, &params).await?;
        debug!(rows = rows.len(), ?years, "fetched municipal consumption");
        Ok(rows)
    }

    /// Regional rows recorded on `day`
    pub async fn fetch_regional(&self, day: NaiveDate) -> Result<Vec<RawRegionalRow>> {
        let where_clause = format!("date='{}'", day.format("%Y-%m-%d"));
        let params = [
            ("limit", "-1"),
            ("select", "code_insee_region, libelle_region, date, date_heure, consommation"),
            ("where", where_clause.as_str()),
        ];

        let rows: Vec<RawRegionalRow> = self.get_json(&self.regional_url, &params).await?;
        debug!(rows = rows.len(), %day, "fetched regional consumption");
        Ok(rows)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, params: &[(&str, &str)]) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .context("open-data GET failed")?;
        let status = resp.status();
        let body = resp.text().await.context("open-data read failed")?;
        if !status.is_success() {
            anyhow::bail!("open-data API error: HTTP {status}: {body}");
        }
        serde_json::from_str(&body).context("open-data JSON parse failed")
    }
}
