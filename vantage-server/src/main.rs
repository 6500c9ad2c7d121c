mod owner_lookup;

use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use chrono::Duration;
use tower_http::cors::AllowOrigin;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use vantage_anomaly::InMemoryAnomalyStore;
use vantage_anomaly_loop::AnomalyLoop;
use vantage_auth::AuthService;
use vantage_config::Settings;
use vantage_events::EventBus;
use vantage_events::NoopEventBus;
use vantage_events::RabbitEventBus;
use vantage_ledger::InMemoryLedgerStore;
use vantage_notify::LoggingNotifier;
use vantage_ratelimit::RateLimiterRegistry;
use vantage_reporting::ReportingEngine;
use vantage_subscription::QuotaLimits;
use vantage_subscription::SubscriptionService;
use vantage_subscription::SystemClock;
use vantage_tenancy::InMemoryTenancyStore;
use vantage_tokens::InMemoryRevocationStore;
use vantage_tokens::TokenService;
use vantage_transactions::TransactionService;

use owner_lookup::TenancyOwnerLookup;

fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    if allowed_origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin).context("invalid CORS origin"))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

async fn event_bus(broker_url: &str) -> Arc<dyn EventBus> {
    match RabbitEventBus::connect(broker_url).await {
        Ok(bus) => Arc::new(bus),
        Err(err) => {
            tracing::warn!(%err, "could not connect to broker, falling back to a no-op event bus");
            Arc::new(NoopEventBus::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let settings = Settings::load().context("failed to load configuration")?;

    let tenancy = Arc::new(InMemoryTenancyStore::new());
    let ledger = Arc::new(InMemoryLedgerStore::new());
    let anomalies = Arc::new(InMemoryAnomalyStore::new());
    let events = event_bus(&settings.broker_url).await;

    let revocations = Arc::new(InMemoryRevocationStore::new());
    let tokens = Arc::new(
        TokenService::new(
            &settings.token_secret_base64,
            Duration::hours(settings.token_ttl_hours),
            revocations,
        )
        .context("failed to initialize token service")?,
    );

    let subscriptions = Arc::new(
        SubscriptionService::new(SystemClock)
            .with_trial_window(settings.trial_window_days)
            .with_subscription_duration(settings.subscription_duration_days)
            .with_quotas(QuotaLimits {
                active: settings.ai_chat_quota_active,
                trial: settings.ai_chat_quota_trial,
                free: settings.ai_chat_quota_free,
            }),
    );

    let auth = Arc::new(AuthService::new(
        tenancy.clone(),
        tenancy.clone(),
        tokens.clone(),
        subscriptions.clone(),
        "USD".to_string(),
    ));

    let reporting = Arc::new(ReportingEngine::new(ledger.clone()));
    let transactions = Arc::new(TransactionService::new(ledger.clone(), reporting.clone(), events.clone()));

    let owners = Arc::new(TenancyOwnerLookup::new(tenancy.clone(), tenancy.clone()));
    let notifier = Arc::new(LoggingNotifier::new());
    let anomaly_loop = AnomalyLoop::new(events, anomalies.clone(), notifier, owners);
    tokio::spawn(anomaly_loop.run());

    let rate_limiter = Arc::new(RateLimiterRegistry::with_capacities(
        settings.login_rate_limit_capacity,
        settings.register_rate_limit_capacity,
    ));

    let state = vantage_api::ApiState {
        credentials: tenancy.clone(),
        tenants: tenancy,
        tokens,
        auth,
        subscriptions,
        transactions,
        ledger,
        reporting,
        anomalies,
        rate_limiter,
    };

    let cors = cors_layer(&settings.cors_allowed_origins)?;
    let app = vantage_api::router(state, cors);

    let listener = tokio::net::TcpListener::bind(&settings.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_address))?;
    tracing::info!(address = %settings.bind_address, "vantage-server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::warn!(%err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
