use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matchmaker::api::v1::dto::{DashboardMetricResponse, RankedMatchResponse, SchemaReportResponse};
use matchmaker::api::{create_router, AppState};
use matchmaker::cache::SystemClock;
use matchmaker::config::Config;
use matchmaker::db::{
    DataAccess, Database, LibSqlScoreStore, MemoryDataAccess, MemoryScoreStore, RestDataAccess,
    ScoreStore, TimeoutLayer,
};
use matchmaker::models::MetricName;

#[derive(Parser)]
#[command(name = "matchmaker")]
#[command(about = "Member matching and dashboard metrics for networking platforms")]
struct Args {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Rank candidates for one member and print the result
    Rank {
        #[arg(long)]
        subject: String,
        #[arg(long, value_delimiter = ',', required = true)]
        candidates: Vec<String>,
    },
    /// Compute one dashboard metric and print it
    Metric {
        name: String,
        #[arg(long)]
        subject: Option<String>,
    },
    /// Print the detected columns of backend collections
    Schema {
        #[arg(required = true)]
        collections: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "matchmaker=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let config = Config::from_env();
    let data = build_backend(&config)?;
    let score_store = build_score_store(&config).await?;
    let state = AppState::new(config.clone(), data, score_store, Arc::new(SystemClock));

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state, &config).await,
        Command::Rank {
            subject,
            candidates,
        } => {
            let ranked = state.matching.get_ranked_matches(&subject, &candidates).await?;
            let out: Vec<RankedMatchResponse> =
                ranked.into_iter().map(RankedMatchResponse::from).collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Command::Metric { name, subject } => {
            let name: MetricName = name.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let metric = state
                .dashboard
                .get_dashboard_metric(name, subject.as_deref())
                .await;
            println!(
                "{}",
                serde_json::to_string_pretty(&DashboardMetricResponse::from(metric))?
            );
            Ok(())
        }
        Command::Schema { collections } => {
            let report: Vec<SchemaReportResponse> = state
                .schema
                .schema_report(&collections)
                .await
                .into_iter()
                .map(SchemaReportResponse::from)
                .collect();
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

fn build_backend(config: &Config) -> anyhow::Result<Arc<dyn DataAccess>> {
    let inner: Arc<dyn DataAccess> = match (&config.backend.url, &config.backend.fixture) {
        (Some(url), _) => {
            tracing::info!(url = %url, "Using REST data backend");
            Arc::new(RestDataAccess::new(&config.backend)?)
        }
        (None, Some(fixture)) => {
            tracing::info!(fixture = %fixture, "Using in-memory data backend");
            Arc::new(MemoryDataAccess::from_fixture(fixture)?)
        }
        (None, None) => {
            tracing::warn!("BACKEND_URL and BACKEND_FIXTURE are unset; starting with no data");
            Arc::new(MemoryDataAccess::new())
        }
    };
    Ok(Arc::new(TimeoutLayer::new(
        inner,
        Duration::from_millis(config.backend.timeout_ms),
    )))
}

async fn build_score_store(config: &Config) -> anyhow::Result<Arc<dyn ScoreStore>> {
    if config.cache_database.url == ":memory:" {
        tracing::info!("Score cache is process-local");
        return Ok(Arc::new(MemoryScoreStore::new()));
    }
    tracing::info!("Initializing score cache database...");
    let db = Database::new(&config.cache_database).await?;
    Ok(Arc::new(LibSqlScoreStore::new(db)))
}

async fn serve(state: AppState, config: &Config) -> anyhow::Result<()> {
    let cancel_token = CancellationToken::new();

    let refresh_secs = config.backend.schema_refresh_secs;
    if refresh_secs > 0 {
        tracing::info!("Starting schema refresh... (interval={}s)", refresh_secs);
        let schema = state.schema.clone();
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Schema refresh shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(refresh_secs)) => {
                        let dropped = schema.invalidate_all();
                        tracing::debug!(dropped, "Detected schemas expired");
                    }
                }
            }
        });
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Matchmaker starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
