//! premium-billing server
//!
//! Loads configuration, connects storage, starts the recurring billing loop
//! and serves the webhook and billing API until Ctrl+C.

use std::error::Error;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use premium_billing::adapters::http::{billing_app, BillingAppState, BillingLinks};
use premium_billing::adapters::notification::{HttpRelayNotifier, LogNotifier};
use premium_billing::adapters::postgres::{
    PostgresEntitlementStore, PostgresGiftLedger, PostgresPaymentLedger,
};
use premium_billing::adapters::scheduler::{RecurringBillingConfig, RecurringBillingScheduler};
use premium_billing::adapters::yookassa::{
    ConcurrencyLimitedGateway, YooKassaConfig, YooKassaGateway,
};
use premium_billing::application::handlers::CreateRecurringChargeHandler;
use premium_billing::config::AppConfig;
use premium_billing::ports::{Notifier, PaymentGateway};

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let entitlements = Arc::new(PostgresEntitlementStore::new(pool.clone()));
    let payments = Arc::new(PostgresPaymentLedger::new(pool.clone()));
    let gifts = Arc::new(PostgresGiftLedger::new(pool));

    let gateway = build_gateway(&config)?;
    let notifier = build_notifier(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = if config.scheduler.enabled {
        let charges = Arc::new(CreateRecurringChargeHandler::new(
            payments.clone(),
            gateway.clone(),
        ));
        let scheduler = RecurringBillingScheduler::with_config(
            entitlements.clone(),
            payments.clone(),
            charges,
            notifier.clone(),
            RecurringBillingConfig::default()
                .with_interval(config.scheduler.interval())
                .with_max_concurrency(config.scheduler.max_concurrency),
        );
        Some(tokio::spawn(async move { scheduler.run(shutdown_rx).await }))
    } else {
        tracing::info!("Recurring billing disabled");
        None
    };

    let state = BillingAppState {
        entitlements,
        payments,
        gifts,
        gateway,
        notifier,
        links: BillingLinks {
            checkout_return_url: Some(config.gateway.return_url.clone()),
            gift_link_template: config.links.gift_link_template.clone(),
            payment_return_redirect_url: config.links.payment_return_redirect_url.clone(),
        },
    };
    let app = billing_app(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Billing server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(task) = scheduler_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Recurring billing stopped with error"),
            Err(e) => tracing::error!(error = %e, "Recurring billing task panicked"),
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_gateway(config: &AppConfig) -> Result<Arc<dyn PaymentGateway>, BoxError> {
    let gateway_config = &config.gateway;
    let yookassa = YooKassaGateway::new(
        YooKassaConfig::new(
            gateway_config.shop_id.clone(),
            gateway_config.api_key.clone(),
        )
        .with_base_url(gateway_config.base_url.clone())
        .with_receipt_email(gateway_config.receipt_email.clone())
        .with_request_timeout(gateway_config.request_timeout()),
    )?;

    Ok(Arc::new(ConcurrencyLimitedGateway::new(
        Arc::new(yookassa),
        gateway_config.max_concurrent_requests,
    )))
}

fn build_notifier(config: &AppConfig) -> Result<Arc<dyn Notifier>, BoxError> {
    match &config.links.notification_relay_url {
        Some(url) => {
            tracing::info!(relay_url = %url, "Delivering notifications via relay");
            Ok(Arc::new(HttpRelayNotifier::new(
                url.clone(),
                config.gateway.request_timeout(),
            )?))
        }
        None => {
            tracing::warn!("No notification relay configured; notifications are logged only");
            Ok(Arc::new(LogNotifier::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
