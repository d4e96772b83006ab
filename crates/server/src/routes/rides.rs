//! Ride lifecycle routes.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use carpool_core::{Money, RideId, RouteId};

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, json_or_default};
use crate::middleware::RequireAuth;
use crate::models::{Rating, Ride};
use crate::services::{RideRequest, TripMetrics};
use crate::state::AppState;

use super::{catalog::DriverQuery, path_id, required_user_id};

#[derive(Debug, Serialize)]
pub struct RideResponse {
    pub ride: Ride,
}

fn ride_id(raw: &str) -> Result<RideId> {
    path_id(raw, "Ride")
}

/// Request payload. Any fare or status fields a client sends are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRideForm {
    pub route_id: Option<String>,
    pub seats: Option<u32>,
    #[serde(alias = "pickup")]
    pub origin: Option<String>,
    pub destination: Option<String>,
}

/// POST /rides/request
pub async fn request(
    State(state): State<AppState>,
    RequireAuth(passenger): RequireAuth,
    ApiJson(form): ApiJson<RequestRideForm>,
) -> Result<impl IntoResponse> {
    let route_id: RouteId = form
        .route_id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("routeId is required".to_string()))?
        .parse()
        .map_err(|_| AppError::BadRequest("routeId is not a valid ID".to_string()))?;

    let ride = state
        .rides()
        .request(
            &passenger,
            RideRequest {
                route_id,
                seats: form.seats,
                origin: form.origin,
                destination: form.destination,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(RideResponse { ride })))
}

#[derive(Debug, Serialize)]
pub struct RequestsResponse {
    pub requests: Vec<Ride>,
}

/// GET /rides/requests?driverId=
pub async fn pending_requests(
    State(state): State<AppState>,
    Query(query): Query<DriverQuery>,
) -> Result<Json<RequestsResponse>> {
    let driver_id = required_user_id(query.driver_id.as_deref(), "driverId")?;
    let requests = state.rides().pending_for_driver(driver_id).await?;
    Ok(Json(RequestsResponse { requests }))
}

/// GET /rides/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RideResponse>> {
    let ride = state.rides().get(ride_id(&id)?).await?;
    Ok(Json(RideResponse { ride }))
}

/// PUT /rides/{id}/accept
pub async fn accept(
    State(state): State<AppState>,
    RequireAuth(driver): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<RideResponse>> {
    let ride = state.rides().accept(&driver, ride_id(&id)?).await?;
    Ok(Json(RideResponse { ride }))
}

/// PUT /rides/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    RequireAuth(driver): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<RideResponse>> {
    let ride = state.rides().reject(&driver, ride_id(&id)?).await?;
    Ok(Json(RideResponse { ride }))
}

/// PUT /rides/{id}/seated
pub async fn seated(
    State(state): State<AppState>,
    RequireAuth(driver): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<RideResponse>> {
    let ride = state.rides().mark_seated(&driver, ride_id(&id)?).await?;
    Ok(Json(RideResponse { ride }))
}

/// Trip metrics. Stored for display; the driver is paid the booked fare.
#[derive(Debug, Default, Deserialize)]
pub struct CompleteForm {
    pub distance: Option<f64>,
    pub duration: Option<f64>,
}

/// PUT /rides/{id}/complete
///
/// The body is optional.
pub async fn complete(
    State(state): State<AppState>,
    RequireAuth(driver): RequireAuth,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<RideResponse>> {
    let form: CompleteForm = json_or_default(&body)?;
    let metrics = TripMetrics {
        distance: form.distance,
        duration: form.duration,
    };
    let ride = state
        .rides()
        .complete(&driver, ride_id(&id)?, metrics)
        .await?;
    Ok(Json(RideResponse { ride }))
}

/// PUT /rides/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<RideResponse>> {
    let ride = state.rides().cancel(&user, ride_id(&id)?).await?;
    Ok(Json(RideResponse { ride }))
}

/// Payment payload. `amount`, when sent, must equal the ride total.
#[derive(Debug, Default, Deserialize)]
pub struct PayForm {
    pub amount: Option<Money>,
}

#[derive(Debug, Serialize)]
pub struct PayResponse {
    pub success: bool,
    pub ride: Ride,
    pub balance: Money,
}

/// POST /rides/{id}/pay
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(passenger): RequireAuth,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<PayResponse>> {
    let form: PayForm = json_or_default(&body)?;
    let (ride, balance) = state
        .rides()
        .pay(&passenger, ride_id(&id)?, form.amount)
        .await?;
    Ok(Json(PayResponse {
        success: true,
        ride,
        balance,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RateForm {
    pub rating: Option<u8>,
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub success: bool,
    pub rating: Rating,
}

/// POST /rides/{id}/rate
pub async fn rate(
    State(state): State<AppState>,
    RequireAuth(passenger): RequireAuth,
    Path(id): Path<String>,
    ApiJson(form): ApiJson<RateForm>,
) -> Result<Json<RateResponse>> {
    let rating = form
        .rating
        .ok_or_else(|| AppError::BadRequest("rating is required".to_string()))?;
    let rating = state
        .rides()
        .rate(&passenger, ride_id(&id)?, rating, form.feedback)
        .await?;
    Ok(Json(RateResponse {
        success: true,
        rating,
    }))
}
