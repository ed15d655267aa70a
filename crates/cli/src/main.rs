use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kkongdon_core::catalog::ProductCatalog;
use kkongdon_core::domain::request::RecommendRequestBody;
use kkongdon_core::engine::{EngineConfig, RecommendationOrchestrator};
use kkongdon_core::error::RecommendError;

#[derive(Debug, Parser)]
#[command(name = "kkongdon_cli", about = "Recommend savings products for a bucket-list goal")]
struct Args {
    /// Free-text goal, e.g. "유럽 여행".
    #[arg(long)]
    goal: String,

    /// Amount to save, in KRW.
    #[arg(long)]
    target_amount: f64,

    /// Months to reach the target. Defaults to 12.
    #[arg(long)]
    time_frame: Option<i64>,

    /// conservative, moderate or aggressive.
    #[arg(long)]
    risk_tolerance: Option<String>,

    #[arg(long)]
    age: Option<i64>,

    /// Monthly income, in KRW.
    #[arg(long)]
    income: Option<f64>,

    /// Product catalog JSON file. Overrides PRODUCT_CATALOG_PATH.
    #[arg(long)]
    catalog: Option<String>,

    /// Skip the narrative provider and use the fallback text.
    #[arg(long)]
    no_narrative: bool,

    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = kkongdon_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    // stdout carries the JSON result.
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Some(path) = args.catalog.clone() {
        settings.product_catalog_path = Some(path);
    }
    let catalog = ProductCatalog::from_settings(&settings)?;

    let narrator = if args.no_narrative {
        None
    } else {
        kkongdon_core::llm::from_settings(&settings)?
    };

    let orchestrator =
        RecommendationOrchestrator::new(catalog, EngineConfig::from_env()).with_narrator(narrator);

    let pretty = args.pretty;
    let request = RecommendRequestBody {
        bucket_goal: Some(args.goal),
        target_amount: Some(args.target_amount),
        time_frame: args.time_frame,
        risk_tolerance: args.risk_tolerance,
        age: args.age,
        income: args.income,
    }
    .into_request()
    .map_err(into_anyhow)?;

    let response = orchestrator
        .recommend(&request)
        .await
        .map_err(|err| {
            let err = into_anyhow(err);
            sentry_anyhow::capture_anyhow(&err);
            err
        })?;

    let json = if pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .context("failed to serialize recommendation")?;
    println!("{json}");

    tracing::info!(
        goal = %response.bucket_goal,
        count = response.total_products,
        "recommendation printed"
    );
    Ok(())
}

fn into_anyhow(err: RecommendError) -> anyhow::Error {
    match err {
        RecommendError::Validation(message) => anyhow::anyhow!(message),
        RecommendError::Internal(e) => e.context(kkongdon_core::error::INTERNAL_ERROR_MESSAGE),
    }
}

fn init_sentry(settings: &kkongdon_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
