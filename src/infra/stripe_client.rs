use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;

use crate::app_error::{AppError, AppResult};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Default allowed clock skew between the signature timestamp and now.
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Minimal Stripe REST client. Requests are form-encoded with basic auth.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: SecretString) -> Self {
        Self::with_api_base(secret_key, STRIPE_API_BASE)
    }

    pub fn with_api_base(secret_key: SecretString, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key.expose_secret()));
        format!("Basic {}", encoded)
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> AppResult<T> {
        let response = self
            .client
            .post(format!("{}/{}", self.api_base, path))
            .header("Authorization", self.auth_header())
            .form(params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, path, "Stripe request failed");
                AppError::Gateway(format!("Stripe request failed: {}", e))
            })?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Customers
    // ========================================================================

    pub async fn create_customer(
        &self,
        name: &str,
        email: &str,
        metadata: &[(&str, String)],
    ) -> AppResult<StripeCustomer> {
        let mut params: Vec<(String, String)> = vec![
            ("name".to_string(), name.to_string()),
            ("email".to_string(), email.to_string()),
        ];
        params.extend(
            metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{}]", key), value.clone())),
        );

        self.post_form("customers", &params).await
    }

    // ========================================================================
    // Checkout Sessions
    // ========================================================================

    pub async fn create_checkout_session(
        &self,
        params: &CreateCheckoutSessionParams<'_>,
    ) -> AppResult<StripeCheckoutSession> {
        self.post_form("checkout/sessions", &params.to_form()).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Stripe API error");

            if let Ok(error) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(AppError::Gateway(
                    error.error.message.unwrap_or(error.error.error_type),
                ));
            }

            return Err(AppError::Gateway(format!("Stripe API error: {}", status)));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse Stripe response");
            AppError::Gateway(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

/// Parameters for `POST /checkout/sessions`.
#[derive(Debug)]
pub struct CreateCheckoutSessionParams<'a> {
    pub customer: &'a str,
    pub payment_method_types: Vec<&'a str>,
    /// `(price, quantity)` pairs.
    pub line_items: Vec<(&'a str, u32)>,
    pub mode: &'a str,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
    pub metadata: Vec<(&'a str, &'a str)>,
}

impl CreateCheckoutSessionParams<'_> {
    fn to_form(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("customer".to_string(), self.customer.to_string()),
            ("mode".to_string(), self.mode.to_string()),
            ("success_url".to_string(), self.success_url.to_string()),
            ("cancel_url".to_string(), self.cancel_url.to_string()),
        ];

        for (i, method) in self.payment_method_types.iter().enumerate() {
            params.push((format!("payment_method_types[{}]", i), method.to_string()));
        }

        for (i, (price, quantity)) in self.line_items.iter().enumerate() {
            params.push((format!("line_items[{}][price]", i), price.to_string()));
            params.push((format!("line_items[{}][quantity]", i), quantity.to_string()));
        }

        for (key, value) in &self.metadata {
            params.push((format!("metadata[{}]", key), value.to_string()));
        }

        params
    }
}

// ============================================================================
// Webhook Signature Verification
// ============================================================================

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against
/// the raw payload. Fails if no `v1` signature matches or the timestamp is
/// further than `tolerance_secs` from `now`.
pub fn verify_webhook_signature(
    payload: &str,
    signature_header: &str,
    webhook_secret: &SecretString,
    tolerance_secs: i64,
    now: i64,
) -> AppResult<()> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| AppError::Gateway("Missing timestamp in signature".into()))?;

    if signatures.is_empty() {
        return Err(AppError::Gateway("Missing signature".into()));
    }

    let expected = compute_signature(timestamp, payload, webhook_secret)?;

    if !signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected))
    {
        return Err(AppError::Gateway(
            "No signatures found matching the expected signature for payload".into(),
        ));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| AppError::Gateway("Invalid timestamp".into()))?;
    if (now - ts).abs() > tolerance_secs {
        return Err(AppError::Gateway(
            "Timestamp outside the tolerance zone".into(),
        ));
    }

    Ok(())
}

/// Hex HMAC-SHA256 of `"<timestamp>.<payload>"`.
pub fn compute_signature(
    timestamp: &str,
    payload: &str,
    webhook_secret: &SecretString,
) -> AppResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(webhook_secret.expose_secret().as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify the signature, then parse the payload as an event.
pub fn construct_event<T: for<'de> Deserialize<'de>>(
    payload: &str,
    signature_header: &str,
    webhook_secret: &SecretString,
    tolerance_secs: i64,
) -> AppResult<T> {
    verify_webhook_signature(
        payload,
        signature_header,
        webhook_secret,
        tolerance_secs,
        Utc::now().timestamp(),
    )?;

    serde_json::from_str(payload)
        .map_err(|e| AppError::Gateway(format!("Invalid webhook payload: {}", e)))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

// ============================================================================
// Stripe Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub customer: Option<String>,
    pub payment_intent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(rename = "type")]
    error_type: String,
    message: Option<String>,
}
