//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{Months, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::entities::{
    subscription::{Subscription, SubscriptionStatus},
    subscription_plan::{SubscriptionPlan, SubscriptionPlanKind},
    user::UserBillingIdentity,
};

/// Create a test user without any Stripe identity.
pub fn create_test_user(overrides: impl FnOnce(&mut UserBillingIdentity)) -> UserBillingIdentity {
    let id = Uuid::new_v4();
    let mut user = UserBillingIdentity {
        id,
        full_name: "Test User".to_string(),
        email: format!("user-{}@example.com", id.simple()),
        stripe_customer_id: None,
        stripe_payment_method_id: None,
    };
    overrides(&mut user);
    user
}

/// Create the monthly plan used across tests (amount 20000, price `price_abc`).
pub fn create_test_plan(overrides: impl FnOnce(&mut SubscriptionPlan)) -> SubscriptionPlan {
    let mut plan = SubscriptionPlan {
        plan: "monthly".to_string(),
        name: "Monthly".to_string(),
        price_id: "price_abc".to_string(),
        amount: Decimal::from(20000),
        currency: "VND".to_string(),
    };
    overrides(&mut plan);
    plan
}

/// Create a pending monthly subscription starting now.
pub fn create_test_subscription(
    user_id: Uuid,
    overrides: impl FnOnce(&mut Subscription),
) -> Subscription {
    let now = Utc::now();
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        user_id,
        plan: SubscriptionPlanKind::Monthly,
        start_date: now,
        end_date: now.checked_add_months(Months::new(1)).unwrap(),
        status: SubscriptionStatus::Pending,
        amount: Decimal::from(20000),
        stripe_session_id: format!("cs_test_{}", Uuid::new_v4().simple()),
        stripe_subscription_id: None,
        stripe_payment_intent_id: None,
        failure_reason: None,
        created_at: now,
        updated_at: now,
    };
    overrides(&mut subscription);
    subscription
}
