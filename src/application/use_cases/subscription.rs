use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        subscription::{Subscription, SubscriptionStatus, SubscriptionView},
        subscription_plan::{self, SubscriptionPlan, SubscriptionPlanKind},
        user::has_active_subscription,
    },
};

// ============================================================================
// Ports
// ============================================================================

/// Source of purchasable plans.
///
/// Implementations never fail: an unreadable source is logged and yields an
/// empty list, so callers treat "no plans" as a normal answer.
#[async_trait]
pub trait PlanCatalog: Send + Sync {
    async fn list_plans(&self) -> Vec<SubscriptionPlan>;
}

#[derive(Debug, Clone)]
pub struct CreateSubscriptionInput {
    pub user_id: Uuid,
    pub plan: SubscriptionPlanKind,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub amount: Decimal,
    pub stripe_session_id: String,
}

/// Subscription access outside a checkout transaction. Each call is atomic on
/// its own.
#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>>;
    async fn get_by_stripe_session_id(&self, session_id: &str)
    -> AppResult<Option<Subscription>>;
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>>;
    /// Single conditional `UPDATE ... WHERE stripe_session_id = $1`.
    /// Returns the number of rows touched (0 or 1).
    async fn update_status_by_stripe_session_id(
        &self,
        session_id: &str,
        status: SubscriptionStatus,
    ) -> AppResult<u64>;
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSubscriptionsResponse<'a> {
    pub subscriptions: Vec<SubscriptionView<'a>>,
    pub has_active_subscription: bool,
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct SubscriptionUseCases {
    plan_catalog: Arc<dyn PlanCatalog>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
}

impl SubscriptionUseCases {
    pub fn new(
        plan_catalog: Arc<dyn PlanCatalog>,
        subscription_repo: Arc<dyn SubscriptionRepo>,
    ) -> Self {
        Self {
            plan_catalog,
            subscription_repo,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_plans(&self) -> Vec<SubscriptionPlan> {
        self.plan_catalog.list_plans().await
    }

    /// Exact match on the plan identifier as written in the catalog. No case folding.
    #[instrument(skip(self))]
    pub async fn get_plan_by_name(&self, name: &str) -> AppResult<SubscriptionPlan> {
        self.plan_catalog
            .list_plans()
            .await
            .into_iter()
            .find(|p| p.plan == name)
            .ok_or_else(|| AppError::InvalidPlan(name.to_string()))
    }

    pub fn parse_plan_identifier(input: &str) -> AppResult<SubscriptionPlanKind> {
        SubscriptionPlanKind::parse(input)
    }

    pub fn calculate_end_date(plan: &str, from: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
        subscription_plan::calculate_end_date(plan, from)
    }

    #[instrument(skip(self))]
    pub async fn get_subscription(&self, id: Uuid) -> AppResult<Subscription> {
        self.subscription_repo
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Look up the subscription opened for a checkout session.
    #[instrument(skip(self))]
    pub async fn get_subscription_by_session(&self, session_id: &str) -> AppResult<Subscription> {
        self.subscription_repo
            .get_by_stripe_session_id(session_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    #[instrument(skip(self))]
    pub async fn list_user_subscriptions(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        self.subscription_repo.list_by_user(user_id).await
    }
}

/// Build the `/subscriptions/me` payload for an already loaded list.
pub fn user_subscriptions_response(
    subscriptions: &[Subscription],
    now: DateTime<Utc>,
) -> UserSubscriptionsResponse<'_> {
    UserSubscriptionsResponse {
        subscriptions: subscriptions.iter().map(|s| s.view(now)).collect(),
        has_active_subscription: has_active_subscription(subscriptions, now),
    }
}
