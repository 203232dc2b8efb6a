use crate::auth::{AdminClaims, CurrentPlayer};
use crate::engine::{
    ActivePlayer, CaptureOutcome, DeletedLobby, JoinOutcome, LeaveOutcome, LobbyView,
    MatchSummary, PositionAck, RosterEntry, TeamAssignment,
};
use crate::error::GameError;
use crate::geo::{GeoBounds, GeoPoint};
use crate::lobby::{Lobby, LobbyId, Objective, ObjectiveId, Player, Team};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

type ApiResult<T> = Result<Json<T>, GameError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/lobbies", get(list_lobbies_handler))
        .route("/lobbies/quick_join", post(quick_join_handler))
        .route("/lobbies/private", post(create_private_lobby_handler))
        .route("/lobbies/join_code", post(join_by_code_handler))
        .route("/lobbies/leave", post(leave_lobby_handler))
        .route("/lobbies/:lobby_id", get(lobby_status_handler))
        .route("/lobbies/:lobby_id/join", post(join_lobby_handler))
        .route("/lobbies/:lobby_id/team", post(assign_team_handler))
        .route("/lobbies/:lobby_id/summary", get(summary_handler))
        .route("/lobbies/:lobby_id/players", get(lobby_players_handler))
        .route("/objectives", get(list_objectives_handler))
        .route("/objectives/:objective_id/capture", post(capture_handler))
        .route("/positions", post(report_position_handler))
        .route("/positions/active", get(active_players_handler))
        .route("/admin/lobbies/:lobby_id", delete(delete_lobby_handler))
        .route("/admin/lobbies/:lobby_id/recount", post(recount_handler))
        .route("/admin/players/:player_id/ban", post(ban_handler))
        .route("/admin/players/:player_id/unban", post(unban_handler))
        .route("/admin/objectives/random", post(random_objectives_handler))
        .route("/admin/objectives/scatter", post(scatter_objectives_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn list_lobbies_handler(
    State(state): State<AppState>,
    _player: CurrentPlayer,
) -> ApiResult<Vec<Lobby>> {
    Ok(Json(state.state.engine.list_joinable_lobbies()?))
}

async fn quick_join_handler(
    State(state): State<AppState>,
    CurrentPlayer(player): CurrentPlayer,
) -> ApiResult<JoinOutcome> {
    Ok(Json(state.state.engine.quick_join(&player.id)?))
}

async fn create_private_lobby_handler(
    State(state): State<AppState>,
    CurrentPlayer(player): CurrentPlayer,
) -> ApiResult<JoinOutcome> {
    Ok(Json(state.state.engine.create_private_lobby(&player.id)?))
}

#[derive(Deserialize)]
pub struct JoinCodeRequest {
    code: String,
}

async fn join_by_code_handler(
    State(state): State<AppState>,
    CurrentPlayer(player): CurrentPlayer,
    Json(payload): Json<JoinCodeRequest>,
) -> ApiResult<JoinOutcome> {
    Ok(Json(
        state.state.engine.join_by_code(&player.id, &payload.code)?,
    ))
}

async fn join_lobby_handler(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
    CurrentPlayer(player): CurrentPlayer,
) -> ApiResult<JoinOutcome> {
    Ok(Json(state.state.engine.join(&player.id, &lobby_id)?))
}

async fn leave_lobby_handler(
    State(state): State<AppState>,
    CurrentPlayer(player): CurrentPlayer,
) -> ApiResult<LeaveOutcome> {
    Ok(Json(state.state.engine.leave(&player.id)?))
}

#[derive(Deserialize)]
pub struct AssignTeamRequest {
    team: String,
}

async fn assign_team_handler(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
    CurrentPlayer(player): CurrentPlayer,
    Json(payload): Json<AssignTeamRequest>,
) -> ApiResult<TeamAssignment> {
    let team: Team = payload.team.parse()?;
    Ok(Json(
        state.state.engine.assign_team(&player.id, &lobby_id, team)?,
    ))
}

async fn lobby_status_handler(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
    _player: CurrentPlayer,
) -> ApiResult<LobbyView> {
    Ok(Json(state.state.engine.lobby_status(&lobby_id)?))
}

async fn summary_handler(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
    _player: CurrentPlayer,
) -> ApiResult<MatchSummary> {
    Ok(Json(state.state.engine.match_summary(&lobby_id)?))
}

async fn lobby_players_handler(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
    _player: CurrentPlayer,
) -> ApiResult<Vec<RosterEntry>> {
    Ok(Json(state.state.engine.lobby_roster(&lobby_id)?))
}

async fn list_objectives_handler(
    State(state): State<AppState>,
    CurrentPlayer(player): CurrentPlayer,
) -> ApiResult<Vec<Objective>> {
    Ok(Json(state.state.engine.visible_objectives(&player.id)?))
}

async fn capture_handler(
    State(state): State<AppState>,
    Path(objective_id): Path<ObjectiveId>,
    CurrentPlayer(player): CurrentPlayer,
) -> ApiResult<CaptureOutcome> {
    Ok(Json(state.state.engine.capture(&player.id, objective_id)?))
}

#[derive(Deserialize)]
pub struct PositionRequest {
    lat: f64,
    lon: f64,
    /// Client clock, milliseconds since the Unix epoch.
    timestamp_ms: i64,
}

async fn report_position_handler(
    State(state): State<AppState>,
    CurrentPlayer(player): CurrentPlayer,
    Json(payload): Json<PositionRequest>,
) -> ApiResult<PositionAck> {
    let timestamp = Utc
        .timestamp_millis_opt(payload.timestamp_ms)
        .single()
        .ok_or_else(|| GameError::InvalidInput("timestamp_ms out of range".into()))?;
    Ok(Json(state.state.engine.report_position(
        &player.id,
        payload.lat,
        payload.lon,
        timestamp,
    )?))
}

async fn active_players_handler(
    State(state): State<AppState>,
    _player: CurrentPlayer,
) -> ApiResult<Vec<ActivePlayer>> {
    let engine = &state.state.engine;
    Ok(Json(engine.active_players(engine.config().active_window)?))
}

async fn delete_lobby_handler(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
    _admin: AdminClaims,
) -> ApiResult<DeletedLobby> {
    Ok(Json(state.state.engine.delete_lobby(&lobby_id)?))
}

async fn recount_handler(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
    _admin: AdminClaims,
) -> ApiResult<Lobby> {
    Ok(Json(state.state.engine.recount(&lobby_id)?))
}

async fn ban_handler(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
    _admin: AdminClaims,
) -> ApiResult<Player> {
    Ok(Json(state.state.engine.set_banned(&player_id, true)?))
}

async fn unban_handler(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
    _admin: AdminClaims,
) -> ApiResult<Player> {
    Ok(Json(state.state.engine.set_banned(&player_id, false)?))
}

fn default_radius_km() -> f64 {
    30.0
}

fn default_count() -> usize {
    10
}

#[derive(Deserialize)]
pub struct RandomObjectivesRequest {
    lat: f64,
    lon: f64,
    #[serde(default = "default_radius_km")]
    radius_km: f64,
    #[serde(default = "default_count")]
    count: usize,
}

async fn random_objectives_handler(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Json(payload): Json<RandomObjectivesRequest>,
) -> Result<Json<Value>, GameError> {
    let created = state.state.engine.seed_random(
        GeoPoint::new(payload.lat, payload.lon),
        payload.radius_km,
        payload.count,
    )?;
    Ok(Json(json!({ "created": created.len(), "objectives": created })))
}

#[derive(Deserialize)]
pub struct ScatterObjectivesRequest {
    #[serde(default)]
    bounds: Option<GeoBounds>,
    #[serde(default = "default_count")]
    count: usize,
}

async fn scatter_objectives_handler(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Json(payload): Json<ScatterObjectivesRequest>,
) -> Result<Json<Value>, GameError> {
    let bounds = payload.bounds.unwrap_or(GeoBounds::ITALY);
    let created = state
        .state
        .engine
        .seed_random_in_bounds(bounds, payload.count)?;
    Ok(Json(json!({ "created": created.len(), "objectives": created })))
}
