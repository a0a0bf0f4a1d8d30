use async_trait::async_trait;
use secrecy::SecretString;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{
        CheckoutSession, CheckoutSessionRequest, CustomerId, PaymentGatewayPort, WebhookEvent,
    },
    infra::stripe_client::{self, CreateCheckoutSessionParams, StripeClient},
};

/// Adapter that wraps StripeClient to implement PaymentGatewayPort.
#[derive(Clone)]
pub struct StripeGateway {
    client: StripeClient,
    webhook_tolerance_secs: i64,
}

impl StripeGateway {
    pub fn new(client: StripeClient, webhook_tolerance_secs: i64) -> Self {
        Self {
            client,
            webhook_tolerance_secs,
        }
    }
}

#[async_trait]
impl PaymentGatewayPort for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CheckoutSession> {
        let params = CreateCheckoutSessionParams {
            customer: request.customer_id.as_str(),
            payment_method_types: request
                .payment_method_types
                .iter()
                .map(|m| m.as_ref())
                .collect(),
            line_items: request
                .line_items
                .iter()
                .map(|item| (item.price_id.as_str(), item.quantity))
                .collect(),
            mode: request.mode.as_ref(),
            success_url: &request.urls.success_url,
            cancel_url: &request.urls.cancel_url,
            metadata: request
                .metadata
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
        };

        let session = self.client.create_checkout_session(&params).await?;

        let url = session
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::Gateway("Checkout session has no URL".into()))?;

        Ok(CheckoutSession {
            session_id: session.id,
            url,
        })
    }

    async fn create_customer(
        &self,
        user_id: Uuid,
        full_name: &str,
        email: &str,
    ) -> AppResult<CustomerId> {
        let customer = self
            .client
            .create_customer(full_name, email, &[("userId", user_id.to_string())])
            .await?;
        Ok(CustomerId::new(customer.id))
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
            self.webhook_tolerance_secs,
        )
    }
}
