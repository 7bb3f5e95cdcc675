//! Guild Bridge - command and settings bridge between a chat bot and its dashboard
//!
//! Serves the dashboard REST API and the `/ws` pub/sub endpoint, and runs the
//! bot's own bridge session plus the background audit retention sweep.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, fmt::MakeWriter, prelude::*, EnvFilter, Layer, Registry};

use config::{LogFormat, LogTarget};
use guild_bridge::{api, config, db, services, AppConfig, AppState};
use services::{bot_sync, features, retention, ReconnectPolicy, StaticGateway};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("Guild Bridge {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard flushes file logs when dropped at exit
    let _log_guard = init_logging(&config);

    info!("Guild Bridge starting up");

    info!("Initializing database connection");
    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    let gateway = Arc::new(StaticGateway::from_config(&config.platform));
    let state = AppState::new(config, db, gateway);
    let config = state.config.clone();
    info!(
        "Registered {} actions across {} tenants",
        state.registry.len(),
        state.gateway.tenant_count().await
    );

    let retention = retention::start_retention_scheduler(state.audit.clone(), &config.audit);

    let flag_refresher = config.features.refresh_file.clone().and_then(|path| {
        features::start_flag_refresher(
            state.flags.clone(),
            path,
            Duration::from_secs(config.features.refresh_interval_secs),
        )
    });

    let bot_session = bot_sync::start_bot_sync(
        state.hub.clone(),
        state.db.clone(),
        ReconnectPolicy::from_config(&config.bridge),
    )
    .await
    .context("Failed to open the bot bridge session")?;

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    info!("Starting HTTP server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down");
    bot_session.disconnect().await;
    if let Some(retention) = retention {
        retention.stop().await;
    }
    if let Some(refresher) = flag_refresher {
        refresher.stop().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize logging based on configuration
fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_config = &config.logging;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_config.level));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if matches!(log_config.target, LogTarget::Console | LogTarget::Both) {
        layers.push(format_layer(&log_config.format, std::io::stdout, true));
    }
    if matches!(log_config.target, LogTarget::File | LogTarget::Both) {
        let (writer, file_guard) = create_file_writer(log_config);
        layers.push(format_layer(&log_config.format, writer, false));
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    guard
}

fn format_layer<W>(format: &LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState) -> Router {
    // Dashboards are usually served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    api::router(state).layer(trace_layer).layer(cors)
}

/// Print help message
fn print_help() {
    println!(
        r#"Guild Bridge {}

USAGE:
    guild-bridge [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information

ENVIRONMENT:
    GUILD_BRIDGE_CONFIG         Path to the YAML configuration file
    GUILD_BRIDGE_SERVICE_TOKEN  Shared credential for the REST API
    DATABASE_URL                SQLite URL of the audit database
    RUST_LOG                    Log filter, overrides logging.level

CONFIGURATION:
    Without GUILD_BRIDGE_CONFIG the first existing file wins:
    1. ./guild-bridge.yaml
    2. ./config/guild-bridge.yaml
    3. $XDG_CONFIG_HOME/guild-bridge/config.yaml
    4. /etc/guild-bridge/config.yaml"#,
        env!("CARGO_PKG_VERSION")
    );
}
