use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use clap::{Parser, Subcommand};
use room_core::{EventRouter, PersistenceGateway, PresenceTracker, SessionRegistry};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::cors::CorsLayer;
use tower_http::trace::MakeSpan;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use uuid::Uuid;

mod cli;
mod config;
mod db;
mod handlers;
mod metrics;
mod models;
mod repository;
#[cfg(test)]
mod test_helpers;
mod ws;

use crate::config::{HubConfig, ServerConfig};
use crate::db::Database;
use crate::metrics::ServerMetrics;
use crate::repository::HubRepository;

/// Custom span maker that adds a unique request ID to each incoming request
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

#[derive(Parser)]
#[command(name = "hub")]
#[command(about = "Live interview room server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Custom data directory (defaults to ~/.interview-hub)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the room server in the foreground
    Server(ServerArgs),

    /// Create a candidate and an ACTIVE interview, then print the interview id
    Seed(SeedArgs),
}

#[derive(Parser)]
struct ServerArgs {
    /// Port for the web server (overrides config.toml)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides config.toml)
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Clean start - reset database (prompt for confirmation)
    #[arg(long)]
    reset_db: bool,
}

#[derive(Parser)]
struct SeedArgs {
    /// Candidate name
    #[arg(long, default_value = "Test Candidate")]
    name: String,

    /// Candidate email; an existing candidate with this email is reused
    #[arg(long, default_value = "candidate@example.com")]
    email: String,

    #[arg(long, default_value = "Software Engineer")]
    position: String,

    #[arg(long)]
    department: Option<String>,

    #[arg(long, value_parser = clap::builder::PossibleValuesParser::new(models::JOB_LEVELS))]
    level: Option<String>,
}

#[derive(Clone)]
pub(crate) struct AppState {
    /// Server runtime configuration
    pub server_config: Arc<ServerConfig>,
    /// Server metrics for observability
    pub metrics: Arc<ServerMetrics>,
    pub db: Arc<Database>,
    pub registry: Arc<SessionRegistry>,
    pub presence: Arc<PresenceTracker>,
    pub router: Arc<EventRouter>,
}

impl AppState {
    pub fn new(
        server_config: Arc<ServerConfig>,
        db: Arc<Database>,
        repository: Arc<HubRepository>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let presence = Arc::new(PresenceTracker::new(registry.clone()));
        let gateway: Arc<dyn PersistenceGateway> = repository;
        let router = Arc::new(EventRouter::new(
            registry.clone(),
            presence.clone(),
            gateway,
        ));
        Self {
            server_config,
            metrics: Arc::new(ServerMetrics::new()),
            db,
            registry,
            presence,
            router,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let debug = matches!(&cli.command, Commands::Server(args) if args.debug);
    init_tracing(debug);

    let config = HubConfig::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Server(args) => run_server(args, config).await,
        Commands::Seed(args) => run_seed(args, config).await,
    }
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "hub=debug,room_core=debug,tower_http=debug,info"
    } else {
        "hub=info,room_core=info,tower_http=info,warn"
    }
}

fn init_tracing(debug: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive(debug)));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();
}

pub(crate) fn build_app(state: AppState) -> Result<Router> {
    let origin = HeaderValue::from_str(&state.server_config.cors_origin)
        .with_context(|| format!("Invalid CORS origin: {}", state.server_config.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = Router::new()
        .route("/api/ws", get(handlers::room_websocket_handler))
        .route("/api/interviews/{id}", get(handlers::get_interview))
        // Health endpoints
        .route("/health", get(handlers::health_handler))
        .route("/health/live", get(handlers::health_live_handler))
        .route("/health/ready", get(handlers::health_ready_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(cors)
        .with_state(state);

    Ok(app)
}

async fn run_server(args: ServerArgs, config: HubConfig) -> Result<()> {
    info!("Starting interview hub");

    // Handle database reset if requested
    if args.reset_db && config.db_path.exists() {
        println!("This will delete all interviews and transcripts!");
        print!("Are you sure? (yes/no): ");
        use std::io::{self, Write};
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim() == "yes" {
            config.reset_database()?;
            println!("Database reset.");
        } else {
            println!("Cancelled.");
        }
    }

    info!("Config file: {}", config.config_toml_path().display());
    let mut server_config = ServerConfig::load(&config.data_dir)?;
    if let Some(host) = args.host {
        server_config.host = host;
    }
    if let Some(port) = args.port {
        server_config.port = port;
    }
    let server_config = Arc::new(server_config);

    info!("Initializing database...");
    let db = Arc::new(Database::new(&config, &server_config).await?);
    let repository = Arc::new(HubRepository::new(db.pool.clone()));

    let state = AppState::new(server_config.clone(), db, repository);
    let app = build_app(state)?;

    let addr = format!("{}:{}", server_config.host, server_config.port)
        .parse::<SocketAddr>()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                server_config.host, server_config.port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let actual_addr = listener.local_addr()?;

    info!("Interview hub listening on http://{}", actual_addr);
    info!("  GET /api/ws              - Room WebSocket");
    info!("  GET /api/interviews/:id  - Interview with transcript");
    info!("CORS origin: {}", server_config.cors_origin);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn run_seed(args: SeedArgs, config: HubConfig) -> Result<()> {
    let server_config = ServerConfig::load(&config.data_dir)?;
    let db = Database::new(&config, &server_config).await?;
    let repository = HubRepository::new(db.pool.clone());

    let interview = cli::seed_command(
        &repository,
        &cli::SeedRequest {
            name: args.name,
            email: args.email,
            position: args.position,
            department: args.department,
            level: args.level,
        },
    )
    .await?;

    println!("{}", interview.id);
    Ok(())
}
