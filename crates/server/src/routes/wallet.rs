//! Wallet routes. A user can only see and move their own money.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use carpool_core::{Money, UserId};

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::services::Statement;
use crate::state::AppState;

/// Resolve an optional `userId` against the session. Omitted means "me".
fn own_wallet(current: &CurrentUser, requested: Option<&str>) -> Result<UserId> {
    let Some(raw) = requested.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(current.id);
    };
    match raw.parse::<UserId>() {
        Ok(id) if id == current.id => Ok(id),
        _ => Err(AppError::Forbidden(
            "You can only access your own wallet".to_string(),
        )),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletQuery {
    pub user_id: Option<String>,
}

/// GET /wallet?userId=
pub async fn statement(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<WalletQuery>,
) -> Result<Json<Statement>> {
    let user_id = own_wallet(&user, query.user_id.as_deref())?;
    Ok(Json(state.wallet().statement(user_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountForm {
    pub amount: Option<Money>,
    pub user_id: Option<String>,
}

impl AmountForm {
    fn amount(&self) -> Result<Money> {
        self.amount
            .ok_or_else(|| AppError::BadRequest("amount is required".to_string()))
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub success: bool,
    pub balance: Money,
}

/// POST /wallet/add
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(form): ApiJson<AmountForm>,
) -> Result<Json<BalanceResponse>> {
    let user_id = own_wallet(&user, form.user_id.as_deref())?;
    let balance = state.wallet().top_up(user_id, form.amount()?).await?;
    Ok(Json(BalanceResponse {
        success: true,
        balance,
    }))
}

/// POST /wallet/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(form): ApiJson<AmountForm>,
) -> Result<Json<BalanceResponse>> {
    let user_id = own_wallet(&user, form.user_id.as_deref())?;
    let balance = state.wallet().withdraw(user_id, form.amount()?).await?;
    Ok(Json(BalanceResponse {
        success: true,
        balance,
    }))
}
