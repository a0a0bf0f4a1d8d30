use std::collections::BTreeMap;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

// ============================================================================
// Port Types - Provider-agnostic domain types
// ============================================================================

/// Event type emitted by the provider once a hosted checkout has been paid.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Placeholder the provider substitutes with the real session id on redirect.
pub const CHECKOUT_SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Unique identifier for a customer in the payment provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethodType {
    Card,
}

/// Checkout mode. Only one-time payments are used: each period is bought
/// separately rather than billed by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CheckoutMode {
    Payment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub price_id: String,
    pub quantity: u32,
}

/// URLs for checkout redirects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUrls {
    /// Must contain [`CHECKOUT_SESSION_ID_PLACEHOLDER`].
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutUrls {
    /// Build redirect URLs, appending the session id placeholder to the success URL.
    pub fn new(success_base: &str, cancel_url: &str) -> Self {
        Self {
            success_url: format!(
                "{}?session_id={}",
                success_base.trim_end_matches('?'),
                CHECKOUT_SESSION_ID_PLACEHOLDER
            ),
            cancel_url: cancel_url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub customer_id: CustomerId,
    pub payment_method_types: Vec<PaymentMethodType>,
    pub line_items: Vec<LineItem>,
    pub mode: CheckoutMode,
    pub urls: CheckoutUrls,
    pub metadata: BTreeMap<String, String>,
}

/// Result of creating a checkout session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub session_id: String,
    /// Hosted checkout page. Never empty on success.
    pub url: String,
}

/// A verified webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    pub fn is_checkout_session_completed(&self) -> bool {
        self.event_type == CHECKOUT_SESSION_COMPLETED
    }
}

// ============================================================================
// Payment Gateway Port
// ============================================================================

/// Payment gateway port. Every async method is one provider call; failures
/// surface as [`AppError::Gateway`] and are never retried here.
#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CheckoutSession>;

    async fn create_customer(
        &self,
        user_id: Uuid,
        full_name: &str,
        email: &str,
    ) -> AppResult<CustomerId>;

    /// Check the signature header against the raw body and parse the event.
    /// This is the only authenticity check for inbound webhooks.
    fn construct_event(
        &self,
        payload: &str,
        signature_header: &str,
        webhook_secret: &SecretString,
    ) -> AppResult<WebhookEvent>;

    /// Session id of a `checkout.session.completed` event.
    fn completed_session_id(&self, event: &WebhookEvent) -> AppResult<String> {
        if !event.is_checkout_session_completed() {
            return Err(AppError::Gateway(
                "Event is not a checkout session completed event".into(),
            ));
        }

        event.data.object["id"]
            .as_str()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Gateway("Checkout session event has no session id".into()))
    }
}
