use crate::app::config::Config;
use crate::app::time::SystemClock;
use crate::arena::{Arena, ArenaStats};
use crate::game::engine::GameEngine;
use crate::game::scoreboard::clamp_limit;
use crate::game::types::ScoreboardEntry;
use crate::store::worker::{load_scoreboard, spawn_store_worker};
use crate::store::PlayerStore;
use crate::transport::ws_session::handle_socket;
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
struct AppState {
    arena: Arc<Arena>,
    store: PlayerStore,
    scoreboard_limit: usize,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    #[serde(flatten)]
    stats: ArenaStats,
}

#[derive(Debug, Serialize)]
struct ScoreboardResponse {
    scores: Vec<ScoreboardEntry>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
}

#[derive(Debug, Deserialize)]
struct ScoreboardQuery {
    limit: Option<String>,
}

pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env();
    tracing::info!(
        grid_width = config.grid_width,
        grid_height = config.grid_height,
        tick_ms = config.tick_ms,
        self_collision = config.self_collision,
        "starting snake arena"
    );

    let store = PlayerStore::connect(&config.database_url, config.db_max_connections).await?;
    let (scoreboard_tx, scoreboard_rx) = mpsc::unbounded_channel();
    let (persist, _store_worker) =
        spawn_store_worker(store.clone(), config.scoreboard_limit, scoreboard_tx);

    let engine = GameEngine::new(config.engine_settings());
    let arena = Arc::new(Arena::new(
        engine,
        store.clone(),
        persist,
        Arc::new(SystemClock),
    ));
    arena.spawn_tick_loop(config.tick_period());
    arena.spawn_scoreboard_relay(scoreboard_rx);

    let state = AppState {
        arena,
        store,
        scoreboard_limit: config.scoreboard_limit,
    };
    let app = router(state);

    let address = format!("0.0.0.0:{}", config.port);
    tracing::info!("listening on {address}");
    let listener = tokio::net::TcpListener::bind(&address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);
    Router::new()
        .route("/api/health", get(health))
        .route("/api/scoreboard", get(scoreboard_get))
        .route("/api/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        stats: state.arena.stats().await,
    })
}

async fn scoreboard_get(
    State(state): State<AppState>,
    Query(params): Query<ScoreboardQuery>,
) -> impl IntoResponse {
    let limit = params
        .limit
        .and_then(|value| value.trim().parse::<usize>().ok())
        .map(clamp_limit)
        .unwrap_or(state.scoreboard_limit);

    match load_scoreboard(&state.store, limit).await {
        Ok(scores) => (StatusCode::OK, Json(ScoreboardResponse { scores })).into_response(),
        Err(error) => {
            tracing::warn!(?error, "scoreboard request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    ok: false,
                    error: "Failed to load scoreboard".to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let arena = Arc::clone(&state.arena);
    ws.on_upgrade(move |socket| handle_socket(socket, arena))
}
