use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Datelike, Duration, Local};
use household_tariff::{
    api,
    app::AppState,
    config::Config,
    domain::{MunicipalityYearRecord, RegionDayRecord},
    store::{ConsumptionStore, InMemoryStore},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const REGION: &str = "Auvergne-Rhône-Alpes";
pub const BODY: &str = r#"{"libelle_region":"Auvergne-Rhône-Alpes","nom_commune":"Brageac","code_commune":"15024","nb_personne":2,"nb_m2":100}"#;

/// Store holding flat forecasts for this year and next plus a loaded region
pub async fn seeded_store() -> Arc<InMemoryStore> {
    let today = Local::now().date_naive();
    let store = Arc::new(InMemoryStore::new());
    store
        .append_municipality_years(&[
            MunicipalityYearRecord::forecast("Brageac", "15024", today.year(), 5.0),
            MunicipalityYearRecord::forecast("Brageac", "15024", today.year() + 1, 5.0),
        ])
        .await
        .unwrap();
    let days: Vec<_> = (1..=5)
        .map(|back| RegionDayRecord::new("84", REGION, today - Duration::days(back), 21_000.0))
        .collect();
    store.append_region_days(&days).await.unwrap();
    store
}

pub fn app(store: Arc<InMemoryStore>) -> Router {
    let state = AppState::with_store(Config::default(), store).unwrap();
    api::router(state)
}

pub async fn send(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
