use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::subscription_plan::SubscriptionPlanKind;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[derive(Default)]
pub enum SubscriptionStatus {
    #[default]
    Pending,
    Active,
    Expired,
    Cancelled,
    PaymentFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: SubscriptionPlanKind,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: SubscriptionStatus,
    pub amount: Decimal,
    pub stripe_session_id: String,
    pub stripe_subscription_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// True once `now` has reached the end date.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_date <= now
    }

    /// Paid for and still inside its period.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && !self.is_expired(now)
    }

    pub fn view(&self, now: DateTime<Utc>) -> SubscriptionView<'_> {
        SubscriptionView {
            subscription: self,
            is_expired: self.is_expired(now),
            is_valid: self.is_valid(now),
        }
    }
}

/// Wire representation of a subscription, including the read-time flags.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView<'a> {
    #[serde(flatten)]
    pub subscription: &'a Subscription,
    pub is_expired: bool,
    pub is_valid: bool,
}
