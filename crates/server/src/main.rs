//! cinelog server entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use cinelog_api::{AppState, app};
use cinelog_common::{Config, LocalStorage};
use cinelog_core::{HousekeepingService, YearService, mailer_from_config};
use cinelog_db::repositories::{HistoryRepository, MovieRepository, YearRepository};
use cinelog_scheduler::{HousekeepingJob, SchedulerConfig, run_job, run_scheduler};
use sea_orm::DatabaseConnection;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Movie reviews with moderated comments.
#[derive(Parser, Debug)]
#[command(name = "cinelog")]
#[command(version)]
struct Cli {
    /// Configuration file, instead of `config/default.toml` and `config/$CINELOG_ENV.toml`
    #[arg(short, long, env = "CINELOG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve HTTP (the default)
    Serve,
    /// Run one housekeeping job and exit
    RunJob {
        /// create-year, purge-history or cleanup-temp-files
        job: HousekeepingJob,
    },
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cinelog=debug,tower_http=debug".into());
    let json = std::env::var("CINELOG_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn housekeeping(db: &Arc<DatabaseConnection>, config: &Config) -> Result<HousekeepingService, BoxError> {
    let year_service = YearService::new(
        db.clone(),
        YearRepository::new(db.clone()),
        MovieRepository::new(db.clone()),
        config.app.year_match,
    );
    Ok(HousekeepingService::new(
        year_service,
        HistoryRepository::new(db.clone()),
        config.app.tz()?,
        config.scheduler.cleanup_paths.clone(),
        Duration::from_secs(config.scheduler.cleanup_max_age_hours * 3600),
    ))
}

async fn serve(config: Config, db: Arc<DatabaseConnection>) -> Result<(), BoxError> {
    info!("Running database migrations...");
    cinelog_db::migrate(&db).await?;
    info!("Migrations completed");

    let storage = Arc::new(LocalStorage::new(
        config.storage.base_path.clone(),
        config.storage.base_url.clone(),
    ));
    let mailer = mailer_from_config(&config.mail)?;
    let state = AppState::new(db.clone(), storage, mailer, &config)?;

    if config.scheduler.enabled {
        let executor = Arc::new(housekeeping(&db, &config)?);
        let scheduler_config = SchedulerConfig {
            timezone: executor.timezone(),
            ..SchedulerConfig::default()
        };
        run_scheduler(scheduler_config, executor);
    } else {
        info!("Scheduler disabled in this process");
    }

    let app = app(state).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    init_tracing();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    let db = Arc::new(cinelog_db::init(&config).await?);
    info!("Connected to database");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db).await,
        Command::RunJob { job } => {
            let executor = housekeeping(&db, &config)?;
            let count = run_job(&executor, job).await?;
            info!(job = %job, count, "Job finished");
            Ok(())
        }
    }
}
