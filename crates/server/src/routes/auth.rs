//! Account registration, login and session routes.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use carpool_core::Role;

use crate::error::{AppError, Result, clear_sentry_user};
use crate::extract::ApiJson;
use crate::middleware::{RequireAuth, bearer_token};
use crate::models::User;
use crate::services::{AuthError, Registration};
use crate::state::AppState;

/// Registration payload. Everything is optional at the wire level so a missing
/// field produces a 400 naming it rather than a generic decode error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_plate: Option<String>,
    pub license_number: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> std::result::Result<String, AuthError> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingField(field))
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

impl TryFrom<RegisterForm> for Registration {
    type Error = AuthError;

    fn try_from(form: RegisterForm) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            name: required(form.name, "name")?,
            email: required(form.email, "email")?,
            phone: required(form.phone, "phone")?,
            // Passwords are taken verbatim; only presence is checked here.
            password: form
                .password
                .filter(|p| !p.is_empty())
                .ok_or(AuthError::MissingField("password"))?,
            role: required(form.role, "role")?.parse::<Role>()?,
            vehicle_model: optional(form.vehicle_model),
            vehicle_plate: optional(form.vehicle_plate),
            license_number: optional(form.license_number),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

/// POST /auth/register, POST /auth/signup
pub async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<RegisterForm>,
) -> Result<impl IntoResponse> {
    let registration = Registration::try_from(form)?;
    let user = state.auth().register(registration).await?;
    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Login response. `accessToken` repeats `token` for older clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    pub access_token: String,
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<LoginForm>,
) -> Result<Json<LoginResponse>> {
    let email = required(form.email, "email")?;
    let password = form
        .password
        .filter(|p| !p.is_empty())
        .ok_or(AuthError::MissingField("password"))?;
    let role = optional(form.role)
        .map(|r| r.parse::<Role>())
        .transpose()
        .map_err(AuthError::from)?;

    let (user, token) = state.auth().login(&email, &password, role).await?;
    Ok(Json(LoginResponse {
        user,
        access_token: token.clone(),
        token,
    }))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
    let success = state.auth().logout(token).await?;
    clear_sentry_user();
    tracing::info!(user_id = %user.id, "user logged out");
    Ok(Json(LogoutResponse { success }))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<UserResponse>> {
    let user = state.auth().get_user(current.id).await?;
    Ok(Json(UserResponse { user }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> RegisterForm {
        RegisterForm {
            name: Some(" Бат ".to_string()),
            email: Some("bat@example.mn".to_string()),
            phone: Some("99112233".to_string()),
            password: Some("correct horse".to_string()),
            role: Some("driver".to_string()),
            vehicle_plate: Some("  ".to_string()),
            ..RegisterForm::default()
        }
    }

    #[test]
    fn test_register_form_trims_and_parses() {
        let registration = Registration::try_from(form()).unwrap();
        assert_eq!(registration.name, "Бат");
        assert_eq!(registration.role, Role::Driver);
        assert!(registration.vehicle_plate.is_none());
    }

    #[test]
    fn test_register_form_names_missing_field() {
        let mut missing_phone = form();
        missing_phone.phone = None;
        assert!(matches!(
            Registration::try_from(missing_phone),
            Err(AuthError::MissingField("phone"))
        ));

        let mut bad_role = form();
        bad_role.role = Some("admin".to_string());
        assert!(matches!(
            Registration::try_from(bad_role),
            Err(AuthError::InvalidRole(_))
        ));
    }
}
