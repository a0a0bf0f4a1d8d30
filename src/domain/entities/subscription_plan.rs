use chrono::{DateTime, Days, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::app_error::{AppError, AppResult};

/// Billing cadence of a plan. Also the plan identifier stored on a subscription.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "subscription_plan", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionPlanKind {
    Daily,
    Monthly,
    Quarterly,
    Yearly,
}

impl SubscriptionPlanKind {
    pub const ALL: [SubscriptionPlanKind; 4] = [
        SubscriptionPlanKind::Daily,
        SubscriptionPlanKind::Monthly,
        SubscriptionPlanKind::Quarterly,
        SubscriptionPlanKind::Yearly,
    ];

    /// Normalize user input (lower-cased) into a plan identifier.
    pub fn parse(input: &str) -> AppResult<Self> {
        input
            .to_lowercase()
            .parse::<SubscriptionPlanKind>()
            .map_err(|_| AppError::InvalidPlan(input.to_string()))
    }

    /// End of a period of this cadence starting at `from`.
    ///
    /// Month arithmetic clamps to the last day of the target month
    /// (Jan 31 + 1 month = Feb 28/29).
    pub fn end_date_from(&self, from: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
        let end = match self {
            SubscriptionPlanKind::Daily => from.checked_add_days(Days::new(1)),
            SubscriptionPlanKind::Monthly => from.checked_add_months(Months::new(1)),
            SubscriptionPlanKind::Quarterly => from.checked_add_months(Months::new(3)),
            SubscriptionPlanKind::Yearly => from.checked_add_months(Months::new(12)),
        };
        end.ok_or_else(|| AppError::Internal(format!("End date overflow for plan {}", self)))
    }
}

/// Compute the expiry of a plan identifier string starting at `from`.
pub fn calculate_end_date(plan: &str, from: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
    SubscriptionPlanKind::parse(plan)?.end_date_from(from)
}

/// A purchasable plan as defined in the static plan file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    /// Plan identifier as written in the plan file (e.g. "monthly").
    pub plan: String,
    pub name: String,
    /// Stripe price id.
    pub price_id: String,
    /// Display price, e.g. `9.99`.
    pub amount: Decimal,
    pub currency: String,
}
