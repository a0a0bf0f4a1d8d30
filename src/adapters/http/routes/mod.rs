pub mod payment;
pub mod subscription;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/payment", payment::router())
        .nest("/subscriptions", subscription::router())
}
