use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::subscription::Subscription;

/// The slice of a user record that billing reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserBillingIdentity {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    /// Set once on first checkout, reused afterwards.
    pub stripe_customer_id: Option<String>,
    pub stripe_payment_method_id: Option<String>,
}

/// True if any of the user's subscriptions is currently valid.
pub fn has_active_subscription(subscriptions: &[Subscription], now: DateTime<Utc>) -> bool {
    subscriptions.iter().any(|s| s.is_valid(now))
}
