use std::sync::Arc;

use crate::{
    infra::config::AppConfig,
    use_cases::{payment::PaymentUseCases, subscription::SubscriptionUseCases},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub subscription_use_cases: Arc<SubscriptionUseCases>,
    pub payment_use_cases: Arc<PaymentUseCases>,
}
