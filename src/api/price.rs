use axum::{body::Bytes, extract::State, Json};
use chrono::Local;
use validator::Validate;

use super::error::ApiError;
use crate::app::AppState;
use crate::domain::{PriceQuote, PricingRequest};

/// Presence check runs before any typed parsing so an incomplete body is
/// always reported as missing fields.
pub fn parse_request(body: &[u8]) -> Result<PricingRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::MissingFields);
    }

    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidBody(format!("Invalid JSON body: {e}")))?;
    let fields = value
        .as_object()
        .ok_or_else(|| ApiError::InvalidBody("Request body must be a JSON object.".to_string()))?;

    if !PricingRequest::REQUIRED_FIELDS
        .iter()
        .all(|f| fields.contains_key(*f))
    {
        return Err(ApiError::MissingFields);
    }

    let req: PricingRequest = serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidBody(format!("Invalid fields: {e}")))?;
    req.validate()?;
    Ok(req)
}

/// GET /price - yearly price for a household
pub async fn get_price(
    State(st): State<AppState>,
    body: Bytes,
) -> Result<Json<PriceQuote>, ApiError> {
    let req = parse_request(&body)?;
    let today = Local::now().date_naive();
    let quote = st.pricing.quote(&req, today).await?;
    Ok(Json(quote))
}
