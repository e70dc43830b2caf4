//! Club membership API server.
//!
//! Loads configuration, connects to Postgres, wires the engine over the
//! Stripe gateway and serves the HTTP API until SIGINT/SIGTERM.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use club_membership::adapters::auth::JwtSessionValidator;
use club_membership::adapters::http::{app_router, AppState};
use club_membership::adapters::postgres::{postgres_record_store, run_migrations};
use club_membership::adapters::stripe::StripePaymentGateway;
use club_membership::application::admin::{admin_authorizer, AdminMembershipService};
use club_membership::application::card_lifecycle::MembershipCardLifecycle;
use club_membership::application::reconciliation::{ReconciliationExecutor, SnapshotLoader};
use club_membership::application::webhook::{WebhookIdempotencyGuard, WebhookProcessor};
use club_membership::config::AppConfig;
use club_membership::domain::foundation::Timestamp;
use club_membership::domain::webhook::StripeWebhookVerifier;

const LEDGER_PURGE_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Club membership server starting"
    );

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        run_migrations(&pool).await?;
        tracing::info!("Database migrations applied");
    }
    let store = postgres_record_store(pool);

    let gateway = Arc::new(StripePaymentGateway::new(config.payment.stripe_config())?);
    if config.payment.is_test_mode() {
        tracing::warn!("Stripe is in test mode");
    }

    let sessions = Arc::new(JwtSessionValidator::new(
        &config.auth.session_secret,
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
    ));
    let authorizer = admin_authorizer(sessions, config.auth.admin_allow_list());

    let cards = Arc::new(MembershipCardLifecycle::new(
        store.cards.clone(),
        store.counters.clone(),
        config.membership.card_settings(),
    ));
    let executor = Arc::new(ReconciliationExecutor::new(
        SnapshotLoader::new(gateway.clone(), store.clone()),
        store.clone(),
        cards.clone(),
    ));
    let guard = Arc::new(WebhookIdempotencyGuard::new(store.webhook_events.clone()));

    spawn_ledger_purge(guard.clone(), config.membership.webhook_retention());

    let state = AppState {
        admin: Arc::new(AdminMembershipService::new(
            authorizer,
            store.clone(),
            gateway.clone(),
            executor.clone(),
            cards.clone(),
            config.membership.admin_settings(),
        )),
        cards,
        webhooks: Arc::new(WebhookProcessor::new(guard, gateway, executor)),
        verifier: Arc::new(StripeWebhookVerifier::new(SecretString::clone(
            &config.payment.stripe_webhook_secret,
        ))),
    };

    let app = app_router(state).layer(TimeoutLayer::new(config.server.request_timeout()));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Periodically drops ledger entries older than the retention window.
fn spawn_ledger_purge(guard: Arc<WebhookIdempotencyGuard>, retention: chrono::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LEDGER_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let cutoff = Timestamp::from_datetime(chrono::Utc::now() - retention);
            match guard.purge_before(cutoff).await {
                Ok(0) => {}
                Ok(deleted) => tracing::info!(deleted, "Purged webhook ledger entries"),
                Err(e) => tracing::warn!(error = %e, "Webhook ledger purge failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
