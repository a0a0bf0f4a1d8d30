use std::{net::SocketAddr, path::PathBuf};

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::infra::stripe_client::DEFAULT_WEBHOOK_TOLERANCE_SECS;

pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    pub jwt_secret: SecretString,
    pub stripe: StripeConfig,
    /// JSON array of purchasable plans, re-read on every lookup.
    pub subscription_plans_path: PathBuf,
}

pub struct StripeConfig {
    pub secret_key: SecretString,
    pub webhook_secret: SecretString,
    /// Checkout success page. The session id query parameter is appended.
    pub success_url: Url,
    pub cancel_url: Url,
    pub webhook_tolerance_secs: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url: String = get_env("DATABASE_URL");
        let db_max_connections: u32 = get_env_default("DB_MAX_CONNECTIONS", 5);
        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3000)),
        );
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");
        let jwt_secret = SecretString::new(get_env::<String>("JWT_SECRET").into());

        let stripe = StripeConfig {
            secret_key: SecretString::new(get_env::<String>("STRIPE_SECRET_KEY").into()),
            webhook_secret: SecretString::new(get_env::<String>("STRIPE_WEBHOOK_SECRET").into()),
            success_url: get_env_default(
                "STRIPE_SUCCESS_URL",
                Url::parse("http://localhost:3000/payment/success")
                    .expect("default success URL is valid"),
            ),
            cancel_url: get_env_default(
                "STRIPE_CANCEL_URL",
                Url::parse("http://localhost:3000/payment/cancel")
                    .expect("default cancel URL is valid"),
            ),
            webhook_tolerance_secs: get_env_default(
                "STRIPE_WEBHOOK_TOLERANCE_SECS",
                DEFAULT_WEBHOOK_TOLERANCE_SECS,
            ),
        };

        let subscription_plans_path: PathBuf = get_env_default(
            "SUBSCRIPTION_PLANS_PATH",
            PathBuf::from("config/subscription-plans.json"),
        );

        Self {
            database_url,
            db_max_connections,
            bind_addr,
            cors_origin,
            jwt_secret,
            stripe,
            subscription_plans_path,
        }
    }
}
