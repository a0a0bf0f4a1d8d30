//! In-memory implementations of the billing ports.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::{
            CheckoutSession, CheckoutSessionRequest, CustomerId, PaymentGatewayPort,
            WebhookEvent,
        },
        use_cases::{
            payment::{BillingTransaction, BillingUnitOfWork},
            subscription::{CreateSubscriptionInput, PlanCatalog, SubscriptionRepo},
        },
    },
    domain::entities::{
        subscription::{Subscription, SubscriptionStatus},
        subscription_plan::SubscriptionPlan,
        user::UserBillingIdentity,
    },
    infra::stripe_client::{self, DEFAULT_WEBHOOK_TOLERANCE_SECS},
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

// ============================================================================
// StaticPlanCatalog
// ============================================================================

#[derive(Default)]
pub struct StaticPlanCatalog {
    plans: Vec<SubscriptionPlan>,
}

impl StaticPlanCatalog {
    pub fn new(plans: Vec<SubscriptionPlan>) -> Self {
        Self { plans }
    }
}

#[async_trait]
impl PlanCatalog for StaticPlanCatalog {
    async fn list_plans(&self) -> Vec<SubscriptionPlan> {
        self.plans.clone()
    }
}

// ============================================================================
// InMemoryBillingStore
// ============================================================================

#[derive(Default)]
struct StoreState {
    users: HashMap<Uuid, UserBillingIdentity>,
    subscriptions: Vec<Subscription>,
}

/// Users and subscriptions behind one lock. Transactions stage their writes
/// and apply them only on commit.
#[derive(Default)]
pub struct InMemoryBillingStore {
    state: Arc<Mutex<StoreState>>,
    begun: AtomicUsize,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: UserBillingIdentity) {
        self.state.lock().unwrap().users.insert(user.id, user);
    }

    pub fn insert_subscription(&self, subscription: Subscription) {
        self.state.lock().unwrap().subscriptions.push(subscription);
    }

    pub fn user(&self, id: Uuid) -> Option<UserBillingIdentity> {
        self.state.lock().unwrap().users.get(&id).cloned()
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    pub fn subscription_by_session(&self, session_id: &str) -> Option<Subscription> {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .find(|s| s.stripe_session_id == session_id)
            .cloned()
    }

    /// Number of transactions opened so far.
    pub fn begun_transactions(&self) -> usize {
        self.begun.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionRepo for InMemoryBillingStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn get_by_stripe_session_id(
        &self,
        session_id: &str,
    ) -> AppResult<Option<Subscription>> {
        Ok(self.subscription_by_session(session_id))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        let mut subs: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        subs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(subs)
    }

    async fn update_status_by_stripe_session_id(
        &self,
        session_id: &str,
        status: SubscriptionStatus,
    ) -> AppResult<u64> {
        let mut state = self.state.lock().unwrap();
        let mut updated = 0;
        for sub in state
            .subscriptions
            .iter_mut()
            .filter(|s| s.stripe_session_id == session_id)
        {
            sub.status = status;
            sub.updated_at = Utc::now();
            updated += 1;
        }
        Ok(updated)
    }
}

#[async_trait]
impl BillingUnitOfWork for InMemoryBillingStore {
    async fn begin(&self) -> AppResult<Box<dyn BillingTransaction>> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryBillingTransaction {
            state: self.state.clone(),
            customer_ids: HashMap::new(),
            new_subscriptions: Vec::new(),
        }))
    }
}

pub struct InMemoryBillingTransaction {
    state: Arc<Mutex<StoreState>>,
    customer_ids: HashMap<Uuid, String>,
    new_subscriptions: Vec<Subscription>,
}

#[async_trait]
impl BillingTransaction for InMemoryBillingTransaction {
    async fn get_user(&mut self, user_id: Uuid) -> AppResult<Option<UserBillingIdentity>> {
        let user = self.state.lock().unwrap().users.get(&user_id).cloned();
        Ok(user.map(|mut u| {
            if let Some(staged) = self.customer_ids.get(&user_id) {
                u.stripe_customer_id = Some(staged.clone());
            }
            u
        }))
    }

    async fn set_stripe_customer_id(
        &mut self,
        user_id: Uuid,
        customer_id: &str,
    ) -> AppResult<()> {
        if !self.state.lock().unwrap().users.contains_key(&user_id) {
            return Err(AppError::UserNotFound);
        }
        self.customer_ids.insert(user_id, customer_id.to_string());
        Ok(())
    }

    async fn create_subscription(
        &mut self,
        input: &CreateSubscriptionInput,
    ) -> AppResult<Subscription> {
        let duplicate = self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .chain(self.new_subscriptions.iter())
            .any(|s| s.stripe_session_id == input.stripe_session_id);
        if duplicate {
            return Err(AppError::InvalidInput(
                "A record with this value already exists".into(),
            ));
        }

        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            plan: input.plan,
            start_date: input.start_date,
            end_date: input.end_date,
            status: SubscriptionStatus::Pending,
            amount: input.amount,
            stripe_session_id: input.stripe_session_id.clone(),
            stripe_subscription_id: None,
            stripe_payment_intent_id: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.new_subscriptions.push(subscription.clone());
        Ok(subscription)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let InMemoryBillingTransaction {
            state,
            customer_ids,
            new_subscriptions,
        } = *self;

        let mut state = state.lock().unwrap();
        for (user_id, customer_id) in customer_ids {
            if let Some(user) = state.users.get_mut(&user_id) {
                user.stripe_customer_id = Some(customer_id);
            }
        }
        state.subscriptions.extend(new_subscriptions);
        Ok(())
    }
}

// ============================================================================
// FakePaymentGateway
// ============================================================================

/// Gateway that hands out sequential ids (`cus_1`, `cs_1`, ...) and records
/// every request. Webhook verification is the real HMAC check.
#[derive(Default)]
pub struct FakePaymentGateway {
    customers: Mutex<Vec<(Uuid, String, String)>>,
    checkout_requests: Mutex<Vec<CheckoutSessionRequest>>,
    checkout_failure: Option<String>,
    customer_failure: Option<String>,
}

impl FakePaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_checkout(mut self, message: &str) -> Self {
        self.checkout_failure = Some(message.to_string());
        self
    }

    pub fn fail_customer(mut self, message: &str) -> Self {
        self.customer_failure = Some(message.to_string());
        self
    }

    pub fn customer_calls(&self) -> usize {
        self.customers.lock().unwrap().len()
    }

    pub fn checkout_calls(&self) -> usize {
        self.checkout_requests.lock().unwrap().len()
    }

    pub fn last_checkout_request(&self) -> Option<CheckoutSessionRequest> {
        self.checkout_requests.lock().unwrap().last().cloned()
    }

    /// Build a `stripe-signature` header for `payload` signed now.
    pub fn sign(payload: &str, secret: &str) -> String {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = stripe_client::compute_signature(
            &timestamp,
            payload,
            &SecretString::new(secret.into()),
        )
        .unwrap();
        format!("t={},v1={}", timestamp, signature)
    }
}

#[async_trait]
impl PaymentGatewayPort for FakePaymentGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CheckoutSession> {
        let mut requests = self.checkout_requests.lock().unwrap();
        requests.push(request.clone());
        if let Some(message) = &self.checkout_failure {
            return Err(AppError::Gateway(message.clone()));
        }
        let session_id = format!("cs_{}", requests.len());
        Ok(CheckoutSession {
            url: format!("https://pay/{}", session_id),
            session_id,
        })
    }

    async fn create_customer(
        &self,
        user_id: Uuid,
        full_name: &str,
        email: &str,
    ) -> AppResult<CustomerId> {
        let mut customers = self.customers.lock().unwrap();
        customers.push((user_id, full_name.to_string(), email.to_string()));
        if let Some(message) = &self.customer_failure {
            return Err(AppError::Gateway(message.clone()));
        }
        Ok(CustomerId::new(format!("cus_{}", customers.len())))
    }

    fn construct_event(
        &self,
        payload: &str,
        signature_header: &str,
        webhook_secret: &SecretString,
    ) -> AppResult<WebhookEvent> {
        stripe_client::construct_event(
            payload,
            signature_header,
            webhook_secret,
            DEFAULT_WEBHOOK_TOLERANCE_SECS,
        )
    }
}
