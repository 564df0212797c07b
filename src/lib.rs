pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod forecast;
pub mod ingestion;
pub mod pricing;
pub mod store;
pub mod telemetry;
