use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;

use crate::{
    adapters::http::{app_state::AppState, auth::current_user},
    app_error::{AppError, AppResult},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(create_checkout_session))
        .route("/webhook", post(handle_webhook))
}

#[derive(Deserialize)]
struct CheckoutRequest {
    plan: String,
}

/// POST /api/payment/checkout
async fn create_checkout_session(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&headers, &app_state)?;

    let response = app_state
        .payment_use_cases
        .create_checkout_session(user_id, &payload.plan)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/payment/webhook
/// The body must reach signature verification byte-for-byte, so it is taken raw.
async fn handle_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Gateway("Missing Stripe signature".into()))?;

    let payload = std::str::from_utf8(&body)
        .map_err(|_| AppError::Gateway("Webhook payload is not valid UTF-8".into()))?;

    app_state
        .payment_use_cases
        .handle_webhook_event(payload, signature)
        .await?;

    Ok(StatusCode::OK)
}
