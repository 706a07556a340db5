//! Scoreboard-Dash - live leaderboard tracker for timed team events
//!
//! Usage:
//!   scoreboard-dash serve --port 3002          - Poll the backend and serve the dashboard API
//!   scoreboard-dash watch                      - Live leaderboard in the terminal
//!   scoreboard-dash export --format csv        - One-shot leaderboard export
//!   scoreboard-dash team score 7 42            - Admin operations on teams

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracker::{
    export, poll_callback, ExportFormat, LeaderboardStore, Poller, RankedTeam, ScoreboardClient,
    ScoreboardError, TeamDraft, TeamPatch, TrackerConfig,
};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "scoreboard-dash")]
#[command(about = "Live leaderboard tracker for timed team events", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Scoreboard backend base URL (overrides SCOREBOARD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Polling interval in milliseconds (overrides SCOREBOARD_POLL_INTERVAL_MS)
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the backend and serve the dashboard JSON API
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = 3002)]
        port: u16,
    },
    /// Print the live leaderboard in the terminal until Ctrl+C
    Watch {
        /// Stop after this many polls
        #[arg(long)]
        rounds: Option<u32>,
    },
    /// Fetch the leaderboard once and export it
    Export {
        /// Export format: csv or json
        #[arg(long, default_value = "csv")]
        format: String,
        /// Output path (defaults to leaderboard-<date>.<ext>)
        #[arg(long)]
        output: Option<String>,
    },
    /// Create, edit and remove teams
    Team {
        #[command(subcommand)]
        command: TeamCommand,
    },
}

#[derive(Subcommand)]
enum TeamCommand {
    /// Register a new team
    Add {
        #[arg(long)]
        name: String,
        /// Team member (repeat for each member, 1 to 5)
        #[arg(long = "member", required = true)]
        members: Vec<String>,
        #[arg(long, default_value_t = 0)]
        score: u64,
    },
    /// Replace a team's name, members and score
    Update {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long = "member", required = true)]
        members: Vec<String>,
        #[arg(long, default_value_t = 0)]
        score: u64,
    },
    /// Set a team's score
    Score { id: String, score: u64 },
    /// Delete a team
    Remove { id: String },
}

#[derive(Clone)]
struct AppState {
    store: Arc<LeaderboardStore>,
    poller: Arc<Poller>,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,tracker=debug,scoreboard_dash=debug")
    } else {
        EnvFilter::new("info,tracker=info,scoreboard_dash=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> TrackerConfig {
    let mut config = TrackerConfig::from_env();
    if let Some(url) = &cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(ms) = cli.interval_ms.filter(|&ms| ms > 0) {
        config.poll_interval = Duration::from_millis(ms);
    }
    config
}

fn build_store(config: &TrackerConfig) -> anyhow::Result<Arc<LeaderboardStore>> {
    let client = ScoreboardClient::new(config)?;
    Ok(Arc::new(LeaderboardStore::new(Arc::new(client))))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(&cli);

    match cli.command {
        Commands::Serve { host, port } => {
            cmd_serve(config, &host, port).await?;
        }
        Commands::Watch { rounds } => {
            cmd_watch(config, rounds).await?;
        }
        Commands::Export { format, output } => {
            cmd_export(config, &format, output).await?;
        }
        Commands::Team { command } => {
            cmd_team(config, command).await?;
        }
    }

    Ok(())
}

// ============================================================================
// Serve command - Axum web server
// ============================================================================

async fn cmd_serve(config: TrackerConfig, host: &str, port: u16) -> anyhow::Result<()> {
    info!("Scoreboard-Dash v{} starting...", APP_VERSION);

    let store = build_store(&config)?;
    let poller = Arc::new(Poller::new(config.poll_interval, store.poll_callback())?);

    // Team list feeds the stats view; the poller only tracks the leaderboard
    if let Err(e) = store.refresh_teams().await {
        warn!(error = %e, "Initial team fetch failed");
    }
    poller.set_enabled(true);

    let state = AppState {
        store,
        poller: poller.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(api_health))
        .route("/leaderboard", get(api_leaderboard))
        .route("/leaderboard/refresh", post(api_refresh))
        .route("/polling", post(api_set_polling))
        .route("/stats", get(api_stats))
        .route("/teams", get(api_list_teams).post(api_create_team))
        .route(
            "/teams/:id",
            get(api_get_team)
                .put(api_update_team)
                .patch(api_patch_team)
                .delete(api_delete_team),
        )
        .route("/export", get(api_export))
        .with_state(state);

    let app = Router::new().nest("/api", api_routes).layer(cors);

    let addr: std::net::SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("\n=== Scoreboard-Dash v{} ===", APP_VERSION);
    println!("Backend: {}", config.api_url);
    println!("Polling every {} ms", config.poll_interval.as_millis());
    println!("Listening on http://{}", addr);
    println!("\nEndpoints:");
    println!("  GET    /api/health               - Health check");
    println!("  GET    /api/leaderboard          - Ranked leaderboard with trends");
    println!("  POST   /api/leaderboard/refresh  - Refresh now");
    println!("  POST   /api/polling              - Enable/disable polling");
    println!("  GET    /api/stats                - Dashboard statistics");
    println!("  GET    /api/teams                - List teams");
    println!("  POST   /api/teams                - Create team");
    println!("  GET    /api/teams/:id            - Get team");
    println!("  PUT    /api/teams/:id            - Replace team");
    println!("  PATCH  /api/teams/:id            - Update team fields");
    println!("  DELETE /api/teams/:id            - Delete team");
    println!("  GET    /api/export?format=csv    - Export leaderboard");
    println!("\nPress Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Ctrl+C received, shutting down");
        })
        .await?;

    poller.set_enabled(false);
    Ok(())
}

// ============================================================================
// Watch command - terminal leaderboard
// ============================================================================

async fn cmd_watch(config: TrackerConfig, rounds: Option<u32>) -> anyhow::Result<()> {
    println!("\n=== Scoreboard-Dash v{} ===", APP_VERSION);
    println!(
        "Backend: {} | Polling every {} ms",
        config.api_url,
        config.poll_interval.as_millis()
    );
    println!("Press Ctrl+C to stop\n");

    let store = build_store(&config)?;
    let completed = Arc::new(AtomicU32::new(0));

    let callback = {
        let store = store.clone();
        let completed = completed.clone();
        poll_callback(move || {
            let store = store.clone();
            let completed = completed.clone();
            async move {
                match store.refresh().await {
                    Ok(board) => print_board(&board),
                    Err(e) => println!("  Refresh failed: {} (showing last known board)", e),
                }
                completed.fetch_add(1, Ordering::SeqCst);
            }
        })
    };
    let poller = Poller::new(config.poll_interval, callback)?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_for_ctrlc = cancelled.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl+C received, stopping watch...");
        cancelled_for_ctrlc.store(true, Ordering::SeqCst);
    });

    poller.set_enabled(true);
    loop {
        tokio::time::sleep(Duration::from_millis(200)).await;
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        if rounds.is_some_and(|r| completed.load(Ordering::SeqCst) >= r) {
            break;
        }
    }
    poller.set_enabled(false);

    Ok(())
}

fn print_board(board: &[RankedTeam]) {
    println!("\nLeaderboard @ {}", Local::now().format("%H:%M:%S"));
    if board.is_empty() {
        println!("  (no teams yet)");
        return;
    }
    println!(
        "  {:>3}  {:<24} {:>8}  {:<5} {}",
        "#", "Team", "Score", "Trend", "Members"
    );
    println!("  {}", "-".repeat(70));
    for entry in board {
        println!(
            "  {:>3}  {:<24} {:>8}  {:<5} {}",
            entry.rank,
            entry.team.name,
            entry.team.score,
            entry.trend.arrow(),
            entry.team.members.join(", "),
        );
    }
}

// ============================================================================
// Export command
// ============================================================================

async fn cmd_export(config: TrackerConfig, format: &str, output: Option<String>) -> anyhow::Result<()> {
    let format: ExportFormat = format.parse()?;
    let store = build_store(&config)?;
    let board = store.refresh().await?;

    let body = export(&board, format)?;
    let path = output.unwrap_or_else(|| format.default_file_name(Local::now().date_naive()));
    std::fs::write(&path, body)?;
    println!("Exported {} teams to {}", board.len(), path);
    Ok(())
}

// ============================================================================
// Team command - admin operations
// ============================================================================

async fn cmd_team(config: TrackerConfig, command: TeamCommand) -> anyhow::Result<()> {
    let store = build_store(&config)?;
    store.refresh().await.ok();

    match command {
        TeamCommand::Add {
            name,
            members,
            score,
        } => {
            let team = store
                .create_team(&TeamDraft {
                    name,
                    members,
                    score,
                })
                .await?;
            println!("Created team {} ({})", team.name, team.id);
        }
        TeamCommand::Update {
            id,
            name,
            members,
            score,
        } => {
            let team = store
                .update_team(
                    &id,
                    &TeamDraft {
                        name,
                        members,
                        score,
                    },
                )
                .await?;
            println!("Updated team {} ({})", team.name, team.id);
        }
        TeamCommand::Score { id, score } => {
            let team = store.patch_team(&id, &TeamPatch::score(score)).await?;
            println!("{} now has {} points", team.name, team.score);
        }
        TeamCommand::Remove { id } => {
            store.delete_team(&id).await?;
            println!("Deleted team {}", id);
        }
    }

    print_board(&store.leaderboard());
    Ok(())
}

// ============================================================================
// API Handlers - Leaderboard & polling
// ============================================================================

type ApiError = (StatusCode, Json<Value>);

fn error_response(err: &ScoreboardError) -> ApiError {
    let status = match err {
        ScoreboardError::Validation(_) => StatusCode::BAD_REQUEST,
        ScoreboardError::Api { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        ScoreboardError::Network(_) | ScoreboardError::Decode(_) => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(json!({
            "success": false,
            "error": err.to_string(),
            "retryable": err.is_retryable(),
        })),
    )
}

/// GET /api/health
async fn api_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "scoreboard-dash",
        "version": APP_VERSION,
    }))
}

/// GET /api/leaderboard - current snapshot
async fn api_leaderboard(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.store.snapshot();
    Json(json!({
        "leaderboard": snapshot.leaderboard,
        "is_loading": snapshot.is_loading,
        "last_error": snapshot.last_error,
        "last_updated": snapshot.last_updated,
        "polling": {
            "enabled": state.poller.is_enabled(),
            "interval_ms": state.poller.interval().as_millis() as u64,
        },
    }))
}

/// POST /api/leaderboard/refresh - manual poll
async fn api_refresh(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match state.store.refresh().await {
        Ok(board) => Ok(Json(json!({
            "success": true,
            "leaderboard": board,
        }))),
        Err(e) => Err(error_response(&e)),
    }
}

#[derive(Deserialize)]
struct PollingRequest {
    enabled: bool,
    interval_ms: Option<u64>,
}

/// POST /api/polling - toggle polling / change interval
async fn api_set_polling(
    State(state): State<AppState>,
    Json(request): Json<PollingRequest>,
) -> Result<Json<Value>, ApiError> {
    if let Some(ms) = request.interval_ms {
        state
            .poller
            .set_interval(Duration::from_millis(ms))
            .map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "success": false, "error": e.to_string() })),
                )
            })?;
    }
    state.poller.set_enabled(request.enabled);
    info!(
        enabled = request.enabled,
        interval_ms = state.poller.interval().as_millis() as u64,
        "Polling updated via API"
    );

    Ok(Json(json!({
        "success": true,
        "enabled": state.poller.is_enabled(),
        "interval_ms": state.poller.interval().as_millis() as u64,
    })))
}

/// GET /api/stats - dashboard statistics (+ backend stats when reachable)
async fn api_stats(State(state): State<AppState>) -> Json<Value> {
    let backend = match state.store.backend_stats().await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Backend stats unavailable");
            None
        }
    };
    Json(json!({
        "success": true,
        "stats": state.store.stats(),
        "backend": backend,
    }))
}

// ============================================================================
// API Handlers - Teams
// ============================================================================

/// GET /api/teams
async fn api_list_teams(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let teams = state
        .store
        .refresh_teams()
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(json!({
        "success": true,
        "data": teams,
        "total": teams.len(),
    })))
}

/// POST /api/teams
async fn api_create_team(
    State(state): State<AppState>,
    Json(draft): Json<TeamDraft>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let team = state
        .store
        .create_team(&draft)
        .await
        .map_err(|e| error_response(&e))?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": team })),
    ))
}

/// GET /api/teams/:id
async fn api_get_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let team = state
        .store
        .fetch_team(&id)
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(json!({ "success": true, "data": team })))
}

/// PUT /api/teams/:id
async fn api_update_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<TeamDraft>,
) -> Result<Json<Value>, ApiError> {
    let team = state
        .store
        .update_team(&id, &draft)
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(json!({ "success": true, "data": team })))
}

/// PATCH /api/teams/:id
async fn api_patch_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<TeamPatch>,
) -> Result<Json<Value>, ApiError> {
    let team = state
        .store
        .patch_team(&id, &patch)
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(json!({ "success": true, "data": team })))
}

/// DELETE /api/teams/:id
async fn api_delete_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .delete_team(&id)
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(json!({ "success": true })))
}

// ============================================================================
// API Handlers - Export
// ============================================================================

#[derive(Deserialize)]
struct ExportParams {
    #[serde(default = "default_export_format")]
    format: String,
}

fn default_export_format() -> String {
    "json".to_string()
}

/// GET /api/export?format=csv|json - download the current leaderboard
async fn api_export(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<impl IntoResponse, ApiError> {
    let format: ExportFormat = params.format.parse().map_err(|e: anyhow::Error| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": e.to_string() })),
        )
    })?;

    let body = export(&state.store.leaderboard(), format).map_err(|e| {
        error!("Export failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": format!("Export failed: {}", e) })),
        )
    })?;

    let file_name = format.default_file_name(Utc::now().date_naive());
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    ))
}
