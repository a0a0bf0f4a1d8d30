//! Test app state builder for HTTP-level testing.
//!
//! `TestAppStateBuilder` wires an `AppState` to the in-memory billing store,
//! a static plan catalog and a fake payment gateway.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use url::Url;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt,
        ports::payment_gateway::CheckoutUrls,
        use_cases::{payment::PaymentUseCases, subscription::SubscriptionUseCases},
    },
    domain::entities::{
        subscription::Subscription, subscription_plan::SubscriptionPlan,
        user::UserBillingIdentity,
    },
    infra::{
        config::{AppConfig, StripeConfig},
        stripe_client::DEFAULT_WEBHOOK_TOLERANCE_SECS,
    },
    test_utils::{
        FakePaymentGateway, InMemoryBillingStore, StaticPlanCatalog, TEST_WEBHOOK_SECRET,
        create_test_plan,
    },
};

pub const TEST_JWT_SECRET: &str = "test_jwt_secret";

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let user = create_test_user(|_| {});
/// let builder = TestAppStateBuilder::new().with_user(user.clone());
/// let store = builder.store();
/// let token = builder.access_token(user.id);
/// let app_state = builder.build();
/// ```
pub struct TestAppStateBuilder {
    store: Arc<InMemoryBillingStore>,
    plans: Vec<SubscriptionPlan>,
    gateway: Arc<FakePaymentGateway>,
}

impl TestAppStateBuilder {
    /// New builder with the default monthly plan in the catalog.
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryBillingStore::new()),
            plans: vec![create_test_plan(|_| {})],
            gateway: Arc::new(FakePaymentGateway::new()),
        }
    }

    pub fn with_user(self, user: UserBillingIdentity) -> Self {
        self.store.insert_user(user);
        self
    }

    pub fn with_subscription(self, subscription: Subscription) -> Self {
        self.store.insert_subscription(subscription);
        self
    }

    /// Replace the plan catalog.
    pub fn with_plans(mut self, plans: Vec<SubscriptionPlan>) -> Self {
        self.plans = plans;
        self
    }

    pub fn with_gateway(mut self, gateway: FakePaymentGateway) -> Self {
        self.gateway = Arc::new(gateway);
        self
    }

    /// Store shared with the built state, for assertions.
    pub fn store(&self) -> Arc<InMemoryBillingStore> {
        self.store.clone()
    }

    pub fn gateway(&self) -> Arc<FakePaymentGateway> {
        self.gateway.clone()
    }

    /// A bearer token accepted by the built state.
    pub fn access_token(&self, user_id: Uuid) -> String {
        jwt::issue(
            user_id,
            &SecretString::new(TEST_JWT_SECRET.into()),
            Duration::hours(1),
        )
        .unwrap()
    }

    /// Build the AppState with all configured mocks.
    pub fn build(self) -> AppState {
        let subscription_use_cases = SubscriptionUseCases::new(
            Arc::new(StaticPlanCatalog::new(self.plans)),
            self.store.clone(),
        );

        let config = AppConfig {
            database_url: String::new(),
            db_max_connections: 1,
            bind_addr: "127.0.0.1:3000".parse::<SocketAddr>().unwrap(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
            stripe: StripeConfig {
                secret_key: SecretString::new("sk_test".into()),
                webhook_secret: SecretString::new(TEST_WEBHOOK_SECRET.into()),
                success_url: Url::parse("http://localhost:3000/payment/success").unwrap(),
                cancel_url: Url::parse("http://localhost:3000/payment/cancel").unwrap(),
                webhook_tolerance_secs: DEFAULT_WEBHOOK_TOLERANCE_SECS,
            },
            subscription_plans_path: PathBuf::from("config/subscription-plans.json"),
        };

        let payment_use_cases = PaymentUseCases::new(
            subscription_use_cases.clone(),
            self.store.clone(),
            self.store,
            self.gateway,
            config.stripe.webhook_secret.clone(),
            CheckoutUrls::new(
                config.stripe.success_url.as_str(),
                config.stripe.cancel_url.as_str(),
            ),
        );

        AppState {
            config: Arc::new(config),
            subscription_use_cases: Arc::new(subscription_use_cases),
            payment_use_cases: Arc::new(payment_use_cases),
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
