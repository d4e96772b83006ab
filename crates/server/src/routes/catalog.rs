//! Route publishing, search and lookup.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use carpool_core::{Money, RouteId};

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::models::Route;
use crate::services::NewRoute;
use crate::state::AppState;

use super::{path_id, required_user_id};

/// Publish payload. Accepts the field names of both client generations.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteForm {
    #[serde(alias = "startPoint")]
    pub origin: Option<String>,
    #[serde(alias = "endPoint")]
    pub destination: Option<String>,
    #[serde(default, alias = "midpoints")]
    pub waypoints: Vec<String>,
    pub departure_time: Option<String>,
    pub seats: Option<u32>,
    pub price_per_seat: Option<Money>,
}

impl TryFrom<CreateRouteForm> for NewRoute {
    type Error = AppError;

    fn try_from(form: CreateRouteForm) -> std::result::Result<Self, Self::Error> {
        let missing = |field: &str| AppError::BadRequest(format!("{field} is required"));
        Ok(Self {
            origin: form.origin.ok_or_else(|| missing("origin"))?,
            destination: form.destination.ok_or_else(|| missing("destination"))?,
            waypoints: form.waypoints,
            departure_time: form.departure_time.ok_or_else(|| missing("departureTime"))?,
            seats: form.seats.ok_or_else(|| missing("seats"))?,
            price_per_seat: form.price_per_seat.ok_or_else(|| missing("pricePerSeat"))?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub route: Route,
}

#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub routes: Vec<Route>,
}

/// POST /routes/create
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(driver): RequireAuth,
    ApiJson(form): ApiJson<CreateRouteForm>,
) -> Result<impl IntoResponse> {
    let route = state.catalog().publish(&driver, form.try_into()?).await?;
    Ok((StatusCode::CREATED, Json(RouteResponse { route })))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub pickup: String,
    #[serde(default)]
    pub destination: String,
}

/// POST /routes/search
pub async fn search(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<SearchForm>,
) -> Result<Json<RoutesResponse>> {
    let routes = state.catalog().search(&form.pickup, &form.destination).await?;
    Ok(Json(RoutesResponse { routes }))
}

/// GET /routes/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RouteResponse>> {
    let route_id: RouteId = path_id(&id, "Route")?;
    let route = state.catalog().get(route_id).await?;
    Ok(Json(RouteResponse { route }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverQuery {
    pub driver_id: Option<String>,
}

/// GET /routes?driverId=
pub async fn list_for_driver(
    State(state): State<AppState>,
    Query(query): Query<DriverQuery>,
) -> Result<Json<RoutesResponse>> {
    let driver_id = required_user_id(query.driver_id.as_deref(), "driverId")?;
    let routes = state.catalog().list_for_driver(driver_id).await?;
    Ok(Json(RoutesResponse { routes }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_form_accepts_legacy_names() {
        let form: CreateRouteForm = serde_json::from_str(
            r#"{
                "startPoint": "Баянзүрх",
                "endPoint": "Сүхбаатар талбай",
                "midpoints": ["Зайсан"],
                "departureTime": "2026-03-01T08:00",
                "seats": 4,
                "pricePerSeat": "5000"
            }"#,
        )
        .unwrap();
        let route = NewRoute::try_from(form).unwrap();
        assert_eq!(route.origin, "Баянзүрх");
        assert_eq!(route.waypoints, vec!["Зайсан".to_string()]);
        assert_eq!(route.price_per_seat, Money::from_major(5000));
    }

    #[test]
    fn test_create_form_reports_missing_price() {
        let form: CreateRouteForm = serde_json::from_str(
            r#"{"origin": "A", "destination": "B", "departureTime": "08:00", "seats": 2}"#,
        )
        .unwrap();
        assert!(matches!(
            NewRoute::try_from(form),
            Err(AppError::BadRequest(msg)) if msg == "pricePerSeat is required"
        ));
    }
}
