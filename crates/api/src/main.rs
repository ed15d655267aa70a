use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kkongdon_core::catalog::ProductCatalog;
use kkongdon_core::config::Settings;
use kkongdon_core::engine::{EngineConfig, RecommendationOrchestrator};

mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let catalog = ProductCatalog::from_settings(&settings).inspect_err(|e| {
        sentry_anyhow::capture_anyhow(e);
    })?;
    let config = EngineConfig::from_env();

    let narrator = match kkongdon_core::llm::from_settings(&settings) {
        Ok(narrator) => narrator,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "narrative provider misconfigured; serving fallback text");
            None
        }
    };
    match narrator.as_ref() {
        Some(n) => tracing::info!(provider = n.provider().as_str(), "narrative provider enabled"),
        None => tracing::info!("no narrative provider; serving fallback text"),
    }

    tracing::info!(
        products = catalog.len(),
        min_score = config.min_qualified_score,
        max_results = config.max_recommendations,
        "engine ready"
    );

    let orchestrator = RecommendationOrchestrator::new(catalog, config).with_narrator(narrator);
    let state = routes::AppState {
        orchestrator: Arc::new(orchestrator),
    };

    let cors = routes::cors_layer(std::env::var("CORS_ALLOWED_ORIGINS").ok().as_deref());
    let app = routes::router(state, cors);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
