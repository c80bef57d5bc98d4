// Bingo Registry - Web Server
// REST API with Axum over the same services the CLI uses

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bingo_registry::{
    ApprovalOutcome, BingoError, Board, BoardSummary, LogNotifier, MemoryAccessGrants,
    PendingEntry, PendingSubmission, RegistryBreakdown, SearchHit, Services, Settings,
    SubmissionReceipt, SyncReport, TeamId, UserRecord, Verification,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    services: Arc<Services>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Library error mapped onto an HTTP status
struct ApiError(BingoError);

impl From<BingoError> for ApiError {
    fn from(err: BingoError) -> Self {
        ApiError(err)
    }
}

fn status_for(err: &BingoError) -> StatusCode {
    match err {
        BingoError::NotFound(_) => StatusCode::NOT_FOUND,
        BingoError::AlreadyApproved(_)
        | BingoError::AlreadyPending { .. }
        | BingoError::IdentityConflict { .. } => StatusCode::CONFLICT,
        BingoError::NoMatch { .. }
        | BingoError::InvalidTeam(_)
        | BingoError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
        BingoError::Io { .. } | BingoError::Json { .. } | BingoError::Journal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(ApiResponse::failed(self.0.to_string()))).into_response()
    }
}

// ============================================================================
// Request / Response bodies
// ============================================================================

#[derive(Deserialize, Default)]
struct SyncRequest {
    csv: Option<PathBuf>,
}

#[derive(Deserialize)]
struct VerifyRequest {
    username: String,
    caller: String,
}

#[derive(Serialize)]
struct VerifyResponse {
    reapproval_needed: bool,
    entry: PendingEntry,
}

impl From<Verification> for VerifyResponse {
    fn from(v: Verification) -> Self {
        match v {
            Verification::Pending(entry) => Self {
                reapproval_needed: false,
                entry,
            },
            Verification::ReapprovalNeeded(entry) => Self {
                reapproval_needed: true,
                entry,
            },
        }
    }
}

#[derive(Deserialize)]
struct AdminRequest {
    #[serde(default = "default_admin")]
    admin: String,
}

fn default_admin() -> String {
    "admin".to_string()
}

#[derive(Deserialize)]
struct SubmitRequest {
    caller: String,
    item: String,
    attachment: String,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
}

#[derive(Serialize)]
struct TeamSummary {
    team: TeamId,
    display_name: String,
    board_installed: bool,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/signups/sync - Import paid signups
async fn sync_signups(
    State(state): State<AppState>,
    body: Option<Json<SyncRequest>>,
) -> ApiResult<SyncReport> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let services = &state.services;
    let report = match request.csv {
        Some(path) => services.signups.sync(&services.csv_feed(&path))?,
        None => services.signups.sync_configured()?,
    };
    Ok(Json(ApiResponse::ok(report)))
}

/// POST /api/verify - Claim a username
async fn verify(State(state): State<AppState>, Json(req): Json<VerifyRequest>) -> ApiResult<VerifyResponse> {
    let verification = state.services.signups.verify(&req.username, &req.caller)?;
    Ok(Json(ApiResponse::ok(verification.into())))
}

/// POST /api/users/:caller/approve - Approve a pending verification
async fn approve_user(
    State(state): State<AppState>,
    Path(caller): Path<String>,
    Json(req): Json<AdminRequest>,
) -> ApiResult<UserRecord> {
    let record = state.services.signups.approve_user(&caller, &req.admin)?;
    Ok(Json(ApiResponse::ok(record)))
}

/// POST /api/users/:caller/reject - Reject a pending verification
async fn reject_user(
    State(state): State<AppState>,
    Path(caller): Path<String>,
    Json(req): Json<AdminRequest>,
) -> ApiResult<PendingEntry> {
    let entry = state.services.signups.reject_user(&caller, &req.admin)?;
    Ok(Json(ApiResponse::ok(entry)))
}

/// GET /api/users/pending - Verifications awaiting approval
async fn pending_users(State(state): State<AppState>) -> ApiResult<Vec<PendingEntry>> {
    Ok(Json(ApiResponse::ok(state.services.registry.pending()?)))
}

/// GET /api/registry/breakdown - Per-team signup lists
async fn breakdown(State(state): State<AppState>) -> ApiResult<RegistryBreakdown> {
    Ok(Json(ApiResponse::ok(state.services.registry.breakdown()?)))
}

/// POST /api/submissions - Submit an obtained item
async fn submit(State(state): State<AppState>, Json(req): Json<SubmitRequest>) -> ApiResult<SubmissionReceipt> {
    let receipt = state.services.workflow.submit(&req.caller, &req.item, &req.attachment)?;
    Ok(Json(ApiResponse::ok(receipt)))
}

/// GET /api/submissions/pending - Unapproved submissions on every board
async fn pending_submissions(State(state): State<AppState>) -> ApiResult<Vec<PendingSubmission>> {
    Ok(Json(ApiResponse::ok(state.services.workflow.pending()?)))
}

/// POST /api/submissions/:id/approve - Approve a submission
async fn approve_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AdminRequest>,
) -> ApiResult<ApprovalOutcome> {
    let outcome = state.services.workflow.approve(&id, &req.admin)?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// GET /api/teams - Configured teams
async fn list_teams(State(state): State<AppState>) -> ApiResult<Vec<TeamSummary>> {
    let services = &state.services;
    let roster = services.registry.roster();
    let mut teams = Vec::new();
    for team in roster.ids() {
        let board_installed = match services.engine.load_board(&team) {
            Ok(_) => true,
            Err(BingoError::NotFound(_)) => false,
            Err(e) => return Err(e.into()),
        };
        teams.push(TeamSummary {
            display_name: roster.display_name(&team),
            team,
            board_installed,
        });
    }
    Ok(Json(ApiResponse::ok(teams)))
}

/// GET /api/teams/:team/board - Full board document
async fn get_board(State(state): State<AppState>, Path(team): Path<String>) -> ApiResult<Board> {
    let team = state.services.registry.roster().parse(&team)?;
    Ok(Json(ApiResponse::ok(state.services.engine.load_board(&team)?)))
}

/// PUT /api/teams/:team/board - Validate and install a board
async fn install_board(
    State(state): State<AppState>,
    Path(team): Path<String>,
    Json(board): Json<Board>,
) -> ApiResult<BoardSummary> {
    let team = state.services.registry.roster().parse(&team)?;
    state.services.engine.install_board(&team, &board)?;
    tracing::info!(%team, tiles = board.tiles.len(), "board installed over api");
    Ok(Json(ApiResponse::ok(board.summary())))
}

/// GET /api/teams/:team/progress - Completed / in progress / remaining
async fn progress(State(state): State<AppState>, Path(team): Path<String>) -> ApiResult<BoardSummary> {
    let team = state.services.registry.roster().parse(&team)?;
    Ok(Json(ApiResponse::ok(state.services.engine.board_summary(&team)?)))
}

/// GET /api/teams/:team/search?q= - Item search on one board
async fn search(
    State(state): State<AppState>,
    Path(team): Path<String>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<SearchHit>> {
    let team = state.services.registry.roster().parse(&team)?;
    Ok(Json(ApiResponse::ok(state.services.engine.search(&team, &query.q)?)))
}

// ============================================================================
// Main Server
// ============================================================================

fn app(services: Arc<Services>) -> Router {
    let state = AppState { services };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/signups/sync", post(sync_signups))
        .route("/verify", post(verify))
        .route("/users/pending", get(pending_users))
        .route("/users/:caller/approve", post(approve_user))
        .route("/users/:caller/reject", post(reject_user))
        .route("/registry/breakdown", get(breakdown))
        .route("/submissions", post(submit))
        .route("/submissions/pending", get(pending_submissions))
        .route("/submissions/:id/approve", post(approve_submission))
        .route("/teams", get(list_teams))
        .route("/teams/:team/board", get(get_board).put(install_board))
        .route("/teams/:team/progress", get(progress))
        .route("/teams/:team/search", get(search))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bingo_registry=info,tower_http=info")),
        )
        .init();

    println!("🌐 Bingo Registry - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let settings = Settings::load(None)?;
    let addr = settings.server.bind.clone();
    println!("✓ Data directory: {}", settings.data_dir.display());

    // Role grants are held in memory for the lifetime of the process
    let services = Services::new(
        settings,
        Arc::new(MemoryAccessGrants::new()),
        Arc::new(LogNotifier),
    )
    .context("Failed to open data directory")?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/teams", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(Arc::new(services)))
        .await
        .context("Server error")?;

    Ok(())
}
