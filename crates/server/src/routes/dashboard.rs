//! Driver and passenger dashboards.
//!
//! Open like the rest of the read side: the `userId` query parameter selects
//! whose numbers to show.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::services::{DriverDashboard, Notification, PassengerDashboard};
use crate::state::AppState;

use super::required_user_id;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub user_id: Option<String>,
}

/// GET /driver/dashboard?userId=
pub async fn driver(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DriverDashboard>> {
    let driver_id = required_user_id(query.user_id.as_deref(), "userId")?;
    Ok(Json(state.dashboard().driver(driver_id).await?))
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

/// GET /driver/notifications?userId=
pub async fn notifications(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<NotificationsResponse>> {
    let driver_id = required_user_id(query.user_id.as_deref(), "userId")?;
    let notifications = state.dashboard().notifications(driver_id).await?;
    Ok(Json(NotificationsResponse { notifications }))
}

/// GET /passenger/dashboard?userId=
pub async fn passenger(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<PassengerDashboard>> {
    let passenger_id = required_user_id(query.user_id.as_deref(), "userId")?;
    Ok(Json(state.dashboard().passenger(passenger_id).await?))
}
