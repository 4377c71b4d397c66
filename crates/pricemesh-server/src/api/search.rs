use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use pricemesh_core::{assemble_response, Coordinates, SearchResponse, SearchVerdict};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

/// Raw query string. Every field is optional here so that missing or
/// malformed values produce a JSON `validation_error` instead of axum's
/// plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub(super) struct SearchParams {
    pub query: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
}

impl SearchParams {
    pub(super) fn validate(self) -> Result<(String, Coordinates), String> {
        let query = self
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| "query is required".to_string())?;

        let latitude = parse_coordinate("lat", self.lat.as_deref(), 90.0)?;
        let longitude = parse_coordinate("lon", self.lon.as_deref(), 180.0)?;
        let coords = Coordinates::new(latitude, longitude)
            .ok_or_else(|| "lat and lon must be finite numbers".to_string())?;

        Ok((query, coords))
    }
}

fn parse_coordinate(name: &str, raw: Option<&str>, limit: f64) -> Result<f64, String> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("{name} is required"))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("{name} must be a number, got {raw:?}"))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(format!("{name} must be between -{limit} and {limit}"));
    }
    Ok(value)
}

/// `GET /search?query=&lat=&lon=`
///
/// 200 when any product merged or every source settled cleanly, 503 when
/// nothing merged and at least one source failed.
pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> Result<(StatusCode, Json<SearchResponse>), ApiError> {
    let (query, coords) = params
        .validate()
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;

    tracing::debug!(request_id = %req_id.0, query = %query, "search requested");

    let outcome = state
        .orchestrator
        .search(&query, coords)
        .await
        .map_err(|e| {
            tracing::error!(request_id = %req_id.0, error = %e, "search orchestration failed");
            ApiError::new(req_id.0.clone(), "internal_error", "search failed unexpectedly")
        })?;

    let (verdict, body) = assemble_response(outcome.products, outcome.metadata);
    let status = match verdict {
        SearchVerdict::Ok => StatusCode::OK,
        SearchVerdict::AllSourcesFailed => {
            tracing::warn!(request_id = %req_id.0, "all sources failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    Ok((status, Json(body)))
}
