use crate::{
    adapters::http::app_state::AppState,
    application::{
        ports::payment_gateway::{CheckoutUrls, PaymentGatewayPort},
        use_cases::{
            payment::{BillingUnitOfWork, PaymentUseCases},
            subscription::{PlanCatalog, SubscriptionRepo, SubscriptionUseCases},
        },
    },
    infra::{
        config::AppConfig, plan_catalog::JsonFilePlanCatalog, postgres_persistence,
        stripe_client::StripeClient, stripe_gateway::StripeGateway,
    },
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc =
        Arc::new(postgres_persistence(&config.database_url, config.db_max_connections).await?);

    let unit_of_work = postgres_arc.clone() as Arc<dyn BillingUnitOfWork>;
    let subscription_repo = postgres_arc.clone() as Arc<dyn SubscriptionRepo>;
    let plan_catalog = Arc::new(JsonFilePlanCatalog::new(
        config.subscription_plans_path.clone(),
    )) as Arc<dyn PlanCatalog>;

    let gateway = Arc::new(StripeGateway::new(
        StripeClient::new(config.stripe.secret_key.clone()),
        config.stripe.webhook_tolerance_secs,
    )) as Arc<dyn PaymentGatewayPort>;

    let subscription_use_cases = SubscriptionUseCases::new(plan_catalog, subscription_repo.clone());

    let payment_use_cases = PaymentUseCases::new(
        subscription_use_cases.clone(),
        unit_of_work,
        subscription_repo,
        gateway,
        config.stripe.webhook_secret.clone(),
        CheckoutUrls::new(
            config.stripe.success_url.as_str(),
            config.stripe.cancel_url.as_str(),
        ),
    );

    Ok(AppState {
        config: Arc::new(config),
        subscription_use_cases: Arc::new(subscription_use_cases),
        payment_use_cases: Arc::new(payment_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer().with_target(false).with_level(true).pretty();

    let json_layer = match File::create("app.log") {
        Ok(file) => Some(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(true)
                .with_span_list(true),
        ),
        Err(e) => {
            eprintln!("cannot create log file, JSON logs disabled: {e}");
            None
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
