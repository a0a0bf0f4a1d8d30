use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;

use crate::{
    adapters::http::{app_state::AppState, auth::current_user},
    app_error::AppResult,
    use_cases::subscription::user_subscriptions_response,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/me", get(get_my_subscriptions))
}

/// GET /api/subscriptions/plans
async fn list_plans(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    current_user(&headers, &app_state)?;

    let plans = app_state.subscription_use_cases.list_plans().await;
    Ok(Json(plans))
}

/// GET /api/subscriptions/me
async fn get_my_subscriptions(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let user_id = current_user(&headers, &app_state)?;

    let subscriptions = app_state
        .subscription_use_cases
        .list_user_subscriptions(user_id)
        .await?;

    Ok(Json(user_subscriptions_response(&subscriptions, Utc::now())).into_response())
}
