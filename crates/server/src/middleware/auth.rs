//! Bearer-token authentication extractor.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::services::AuthError;
use crate::state::AppState;

/// Extractor that requires a valid session token.
///
/// Reads `Authorization: Bearer <token>` and resolves it through
/// [`AuthService::authenticate`](crate::services::AuthService::authenticate).
/// Missing, unknown and expired tokens are all rejected with 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// The token from an `Authorization: Bearer` header, if present.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            tracing::debug!("Missing or malformed Authorization header");
            AppError::Unauthorized("Authentication required".to_string())
        })?;

        let user = state
            .auth()
            .authenticate(token)
            .await
            .map_err(|e| match e {
                AuthError::InvalidSession | AuthError::UserNotFound => {
                    AppError::Unauthorized("Invalid or expired session".to_string())
                }
                other => other.into(),
            })?;

        tracing::Span::current().record("user_id", tracing::field::display(user.id));
        set_sentry_user(&user.id, Some(user.email.as_str()));

        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(header: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = header {
            headers.insert(AUTHORIZATION, value.parse().unwrap());
        }
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers(Some("Bearer abc123"))), Some("abc123"));
        assert_eq!(bearer_token(&headers(Some("bearer  abc123 "))), Some("abc123"));
        assert_eq!(bearer_token(&headers(Some("Basic abc123"))), None);
        assert_eq!(bearer_token(&headers(Some("Bearer "))), None);
        assert_eq!(bearer_token(&headers(Some("abc123"))), None);
        assert_eq!(bearer_token(&headers(None)), None);
    }
}
