use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{
        CHECKOUT_SESSION_COMPLETED, CheckoutMode, CheckoutSessionRequest, CheckoutUrls,
        CustomerId, LineItem, PaymentGatewayPort, PaymentMethodType, WebhookEvent,
    },
    application::use_cases::subscription::{
        CreateSubscriptionInput, SubscriptionRepo, SubscriptionUseCases,
    },
    domain::entities::{
        subscription::{Subscription, SubscriptionStatus},
        user::UserBillingIdentity,
    },
};

// ============================================================================
// Unit of Work
// ============================================================================

/// Opens transactions spanning the user and subscription tables.
#[async_trait]
pub trait BillingUnitOfWork: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn BillingTransaction>>;
}

/// Writes made through a transaction become visible only after `commit`.
/// Dropping it uncommitted discards them.
#[async_trait]
pub trait BillingTransaction: Send {
    async fn get_user(&mut self, user_id: Uuid) -> AppResult<Option<UserBillingIdentity>>;

    async fn set_stripe_customer_id(&mut self, user_id: Uuid, customer_id: &str)
    -> AppResult<()>;

    async fn create_subscription(
        &mut self,
        input: &CreateSubscriptionInput,
    ) -> AppResult<Subscription>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub checkout_url: String,
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct PaymentUseCases {
    subscriptions: SubscriptionUseCases,
    unit_of_work: Arc<dyn BillingUnitOfWork>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    gateway: Arc<dyn PaymentGatewayPort>,
    webhook_secret: SecretString,
    checkout_urls: CheckoutUrls,
}

impl PaymentUseCases {
    pub fn new(
        subscriptions: SubscriptionUseCases,
        unit_of_work: Arc<dyn BillingUnitOfWork>,
        subscription_repo: Arc<dyn SubscriptionRepo>,
        gateway: Arc<dyn PaymentGatewayPort>,
        webhook_secret: SecretString,
        checkout_urls: CheckoutUrls,
    ) -> Self {
        Self {
            subscriptions,
            unit_of_work,
            subscription_repo,
            gateway,
            webhook_secret,
            checkout_urls,
        }
    }

    /// Start a hosted checkout for `plan_name` and record a pending subscription.
    ///
    /// Customer provisioning and the subscription insert commit together. Nothing
    /// created on the provider side is undone if a later step fails.
    #[instrument(skip(self))]
    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        plan_name: &str,
    ) -> AppResult<CheckoutSessionResponse> {
        let plan = self.subscriptions.get_plan_by_name(plan_name).await?;
        let plan_kind = SubscriptionUseCases::parse_plan_identifier(&plan.plan)?;

        let mut tx = self.unit_of_work.begin().await?;

        let user = tx.get_user(user_id).await?.ok_or(AppError::UserNotFound)?;

        // Two concurrent first checkouts can both get here and create two customers.
        let customer_id = match user.stripe_customer_id {
            Some(existing) => CustomerId::new(existing),
            None => {
                let created = self
                    .gateway
                    .create_customer(user.id, &user.full_name, &user.email)
                    .await?;
                tx.set_stripe_customer_id(user.id, created.as_str()).await?;
                info!(user_id = %user.id, customer_id = %created, "Provisioned Stripe customer");
                created
            }
        };

        let request = CheckoutSessionRequest {
            customer_id,
            payment_method_types: vec![PaymentMethodType::Card],
            line_items: vec![LineItem {
                price_id: plan.price_id.clone(),
                quantity: 1,
            }],
            mode: CheckoutMode::Payment,
            urls: self.checkout_urls.clone(),
            metadata: BTreeMap::from([
                ("userId".to_string(), user_id.to_string()),
                ("plan".to_string(), plan.plan.clone()),
            ]),
        };
        let session = self.gateway.create_checkout_session(&request).await?;

        let start_date = Utc::now();
        let end_date = plan_kind.end_date_from(start_date)?;

        let subscription = tx
            .create_subscription(&CreateSubscriptionInput {
                user_id,
                plan: plan_kind,
                start_date,
                end_date,
                amount: plan.amount,
                stripe_session_id: session.session_id.clone(),
            })
            .await?;

        tx.commit().await?;

        info!(
            subscription_id = %subscription.id,
            session_id = %session.session_id,
            plan = %plan_kind,
            "Created pending subscription"
        );

        Ok(CheckoutSessionResponse {
            checkout_url: session.url,
        })
    }

    /// Verify an inbound provider event and apply it. Unknown event kinds are accepted.
    #[instrument(skip_all)]
    pub async fn handle_webhook_event(&self, payload: &str, signature: &str) -> AppResult<()> {
        let event = self
            .gateway
            .construct_event(payload, signature, &self.webhook_secret)?;

        match event.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => self.handle_checkout_session_completed(&event).await,
            other => {
                debug!(event_id = %event.id, event_type = other, "Ignoring unhandled webhook event");
                Ok(())
            }
        }
    }

    async fn handle_checkout_session_completed(&self, event: &WebhookEvent) -> AppResult<()> {
        let session_id = self.gateway.completed_session_id(event)?;

        let updated = self
            .subscription_repo
            .update_status_by_stripe_session_id(&session_id, SubscriptionStatus::Active)
            .await?;

        if updated == 0 {
            warn!(event_id = %event.id, session_id = %session_id, "No subscription matches completed checkout session");
        } else {
            info!(event_id = %event.id, session_id = %session_id, "Subscription activated");
        }
        Ok(())
    }
}
