//! HTTP route definitions

use axum::{
    extract::{Extension, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{Board, Game, GameStatus};
use crate::http::middleware::{require_auth, AuthenticatedPlayer};
use crate::store::{Player, StoreError};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    // Public routes; the play socket authenticates with its own token parameter
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/games/:game_id/play", get(ws_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/players/me", get(me_handler))
        .route("/games", get(list_games_handler).post(create_game_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    players: usize,
    games: usize,
    live_games: usize,
    connections: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        players: state.players.count(),
        games: state.games.count(),
        live_games: state.sessions.active_games(),
        connections: state.sessions.connection_count(),
    })
}

// ============================================================================
// Player endpoints
// ============================================================================

async fn me_handler(Extension(auth): Extension<AuthenticatedPlayer>) -> Json<Player> {
    Json(auth.player)
}

// ============================================================================
// Game endpoints
// ============================================================================

#[derive(Deserialize)]
struct CreateGameRequest {
    player1_id: Uuid,
    player2_id: Uuid,
}

/// The new game plus the caller's own board; the opponent's stays hidden
#[derive(Serialize)]
struct CreateGameResponse {
    game: Game,
    board: Board,
}

async fn create_game_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedPlayer>,
    Json(req): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<CreateGameResponse>), AppError> {
    let caller = auth.player.id;

    if req.player1_id == req.player2_id {
        return Err(AppError::BadRequest("A game needs two different players".to_string()));
    }
    if caller != req.player1_id && caller != req.player2_id {
        return Err(AppError::Forbidden(
            "You can only create games you play in".to_string(),
        ));
    }
    for player_id in [req.player1_id, req.player2_id] {
        if state.players.get_player(player_id).is_none() {
            return Err(AppError::NotFound(format!("Player {} not found", player_id)));
        }
    }

    let shared = state.games.create_game(req.player1_id, req.player2_id)?;
    let (game, board) = {
        let session = shared.lock();
        let board = session.board_of(caller).cloned().ok_or_else(|| {
            AppError::Internal("Created game has no board for caller".to_string())
        })?;
        (session.game.clone(), board)
    };

    info!(game_id = %game.id, player_id = %caller, "Game created over HTTP");

    Ok((StatusCode::CREATED, Json(CreateGameResponse { game, board })))
}

async fn list_games_handler(State(state): State<AppState>) -> Json<Vec<Game>> {
    Json(
        state
            .games
            .list_by_status(&[GameStatus::Waiting, GameStatus::InProgress]),
    )
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ActiveGameExists(_) | StoreError::Game(_) => {
                AppError::BadRequest(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
