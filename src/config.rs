use anyhow::{Context, Result};
use chrono::NaiveTime;
use figment::{providers::{Env, Format, Serialized, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::pricing::Tariff;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub pricing: PricingConfig,
    pub forecast: ForecastConfig,
    pub ingestion: IngestionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}
impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StoreConfig {
    /// `memory` or `postgres` (needs the `db` feature)
    pub backend: String,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PricingConfig {
    pub base_rate: f64,
    pub fixed_monthly_fee: f64,
    pub load_window_days: u32,
}
impl PricingConfig {
    pub fn tariff(&self) -> Tariff {
        Tariff {
            base_rate: self.base_rate,
            fixed_monthly_fee: self.fixed_monthly_fee,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ForecastConfig {
    pub max_concurrency: usize,
    /// Overrides the derived target years when set
    pub target_years: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IngestionConfig {
    pub enabled: bool,
    pub municipal_on_startup: bool,
    pub municipal_url: String,
    pub regional_url: String,
    pub history_years: Vec<i32>,
    /// Local wall-clock time of the daily regional run, `HH:MM`
    pub daily_at: String,
    pub http_timeout_seconds: u64,
    pub retries: u32,
    pub retry_delay_seconds: u64,
}
impl IngestionConfig {
    pub fn daily_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.daily_at, "%H:%M")
            .with_context(|| format!("invalid ingestion.daily_at: {}", self.daily_at))
    }
}

impl Default for Config {
    fn default() -> Self {
        let tariff = Tariff::default();
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 8080,
                request_timeout_secs: 6,
            },
            store: StoreConfig {
                backend: "memory".into(),
                url: String::new(),
                max_connections: 10,
            },
            pricing: PricingConfig {
                base_rate: tariff.base_rate,
                fixed_monthly_fee: tariff.fixed_monthly_fee,
                load_window_days: crate::pricing::load::DEFAULT_WINDOW_DAYS,
            },
            forecast: ForecastConfig {
                max_concurrency: 8,
                target_years: None,
            },
            ingestion: IngestionConfig {
                enabled: false,
                municipal_on_startup: false,
                municipal_url: "https://data.enedis.fr/api/explore/v2.1/catalog/datasets/consommation-electrique-par-secteur-dactivite-commune/exports/json".into(),
                regional_url: "https://odre.opendatasoft.com/api/explore/v2.1/catalog/datasets/eco2mix-regional-tr/exports/json".into(),
                history_years: vec![2020, 2021, 2022],
                daily_at: "02:30".into(),
                http_timeout_seconds: 120,
                retries: 1,
                retry_delay_seconds: 5,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::figment().extract().context("failed to load configuration")
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("TARIFF__").split("__"))
    }
}
