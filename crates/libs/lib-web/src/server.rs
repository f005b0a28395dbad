//! # Server Setup
//!
//! Server initialization, route registration, and HTTP server startup.
//!
//! `start_server` owns the process lifecycle: it configures logging, loads and
//! validates [`Config`], migrates the database, builds the [`RoomManager`] and
//! the AI bridge, starts the expired-message sweeper, and serves until Ctrl-C
//! or SIGTERM. On shutdown the room manager is closed so every live socket
//! writer ends.

// region: --- Imports
use crate::chat::{AiBridge, RoomManager};
use crate::handlers;
use crate::middleware::{log_requests, request_id, require_auth, stamp_req};
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use lib_auth::{IdentityVerifier, JwtVerifier};
use lib_core::model::store::MessageLedger;
use lib_core::{create_pool, run_migrations, Config, DbPool};
use lib_utils::get_env_or;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};
// endregion: --- Imports

// region: --- AppState
/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub rooms: RoomManager,
    pub bridge: Arc<AiBridge>,
}

impl AppState {
    /// State with a JWT verifier for `config.jwt_secret` and an empty room registry.
    pub fn new(db: DbPool, config: Config, bridge: Arc<AiBridge>) -> Self {
        let verifier = Arc::new(JwtVerifier::new(config.jwt_secret.clone()));
        Self {
            db,
            config,
            verifier,
            rooms: RoomManager::new(),
            bridge,
        }
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for RoomManager {
    fn from_ref(state: &AppState) -> Self {
        state.rooms.clone()
    }
}
// endregion: --- AppState

// region: --- Server Configuration
/// Server configuration
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3000")
    pub bind_address: String,
    /// Allowed CORS origins; empty or `*` allows any origin
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Read `BIND_ADDRESS` and `ALLOWED_ORIGINS` (comma-separated).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let allowed_origins = get_env_or("ALLOWED_ORIGINS", "")
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            bind_address: get_env_or("BIND_ADDRESS", &defaults.bind_address),
            allowed_origins,
        }
    }
}
// endregion: --- Server Configuration

// region: --- Server Setup
/// Initialize and start the HTTP server
///
/// # Errors
///
/// This function will return an error if:
/// - Configuration loading or validation fails
/// - Database connection or migrations fail
/// - Server binding fails
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    init_tracing()?;

    info!(" COLLABORATION SERVER STARTING");

    info!("Loading configuration...");
    let app_config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    app_config.validate().map_err(|e| anyhow::anyhow!(e))?;

    ensure_sqlite_dir(&app_config.database_url)?;

    info!("Connecting to database...");
    let pool = create_pool(&app_config.database_url).await?;

    info!(" Running database migrations");
    run_migrations(&pool).await?;
    info!(" Migrations complete");

    let bridge = Arc::new(AiBridge::from_env(&app_config.ai_trigger));
    let sweep_every = Duration::from_secs(app_config.message_sweep_secs);
    let state = AppState::new(pool, app_config, bridge);

    let sweeper = spawn_message_sweeper(state.db.clone(), sweep_every);

    let app = create_router(state.clone(), &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

    info!(" SERVER READY: http://{}", config.bind_address);
    log_server_info();

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(state.rooms.clone()))
        .await?;

    sweeper.abort();
    info!(" Server stopped");
    Ok(())
}

/// Configure the global tracing subscriber from `LOG_LEVEL`.
fn init_tracing() -> anyhow::Result<()> {
    let log_level = get_env_or("LOG_LEVEL", "info").to_lowercase();

    let level = match log_level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => log_level.as_str(),
        _ => "info",
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level))
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global tracing subscriber: {}", e))?;

    info!(" Log level: {}", level);
    Ok(())
}

/// Create the parent directory of a file-backed SQLite database.
fn ensure_sqlite_dir(database_url: &str) -> anyhow::Result<()> {
    let Some(db_path) = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };

    let db_path = db_path.split('?').next().unwrap_or(db_path);
    if db_path.is_empty() || db_path.starts_with(":memory:") {
        return Ok(());
    }

    if let Some(parent) = std::path::Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            info!("Created database directory: {:?}", parent);
        }
    }
    info!("Database file will be at: {}", db_path);
    Ok(())
}

/// Periodically delete ledger messages past their deadline.
fn spawn_message_sweeper(db: DbPool, every: Duration) -> JoinHandle<()> {
    info!(" Expired-message sweeper started ({}s interval)", every.as_secs());
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = MessageLedger::purge_expired(&db).await {
                error!(error = %e, "[LEDGER] Sweep failed");
            }
        }
    })
}

/// Resolve on Ctrl-C or SIGTERM, then close every room.
async fn shutdown_signal(rooms: RoomManager) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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

    warn!(" Shutdown signal received");
    rooms.close().await;
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Create the main application router with all routes
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    info!("[ROUTE SETUP] Registering HTTP routes...");

    let protected = Router::new()
        .route("/api/projects/{project_id}", get(handlers::projects::get_project))
        .route("/api/projects/{project_id}/messages", post(handlers::projects::append_message))
        .route(
            "/api/projects/{project_id}/file-tree",
            put(handlers::projects::save_file_tree).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/projects/{project_id}/files/{*path}", delete(handlers::projects::delete_file))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/ws", get(handlers::websocket::collab_websocket))
        .route("/health", get(|| async { "OK" }))
        .merge(protected)
        .fallback(|| async {
            info!("[404 HANDLER] Unmatched route - returning 404");
            (axum::http::StatusCode::NOT_FOUND, "Route not found")
        })
        .with_state(state)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id(request),
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: Duration,
                     _span: &tracing::Span| {
                        error!(
                            error = ?error,
                            latency_ms = latency.as_millis(),
                            "[HTTP FAILURE] Error: {:?}, Latency: {}ms",
                            error,
                            latency.as_millis()
                        );
                    },
                ),
        )
        .layer(axum::middleware::from_fn(log_requests))
        // Outermost of the three so the layers inside see the request id
        .layer(axum::middleware::from_fn(stamp_req))
        .layer(cors_layer(allowed_origins))
}

/// Log server information
fn log_server_info() {
    info!(" REALTIME:");
    info!("   • GET    /ws?projectId={{id}}&token={{jwt}}");
    info!(" PROJECTS (Bearer auth):");
    info!("   • GET    /api/projects/{{id}}");
    info!("   • POST   /api/projects/{{id}}/messages");
    info!("   • PUT    /api/projects/{{id}}/file-tree");
    info!("   • DELETE /api/projects/{{id}}/files/{{path}}");
    info!(" HEALTH:");
    info!("   • GET    /health");
}
// endregion: --- Server Setup
