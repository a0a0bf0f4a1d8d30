use axum::http::{HeaderMap, header::AUTHORIZATION};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
};

/// Resolve the caller from an `Authorization: Bearer <jwt>` header.
pub fn current_user(headers: &HeaderMap, app_state: &AppState) -> AppResult<Uuid> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::InvalidCredentials)?;

    let claims = jwt::verify(token, &app_state.config.jwt_secret)?;
    claims.user_id()
}
