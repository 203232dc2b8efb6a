use crate::lobby::{LobbyId, LobbyStatus, ObjectiveId, PlayerId, Team};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Failure classes exposed at the operation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    AccessDenied,
    Capacity,
    Conflict,
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid team {0:?}, expected RED or BLUE")]
    InvalidTeam(String),
    #[error("invalid position ({lat}, {lon})")]
    InvalidPosition { lat: f64, lon: f64 },
    #[error("position (0, 0) is not a valid fix")]
    NoFix,
    #[error("invalid join code {0:?}")]
    InvalidJoinCode(String),
    #[error("invalid request: {0}")]
    InvalidInput(String),
    #[error("timestamp {0} is too far in the future")]
    FutureTimestamp(DateTime<Utc>),

    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),
    #[error("lobby {0} not found")]
    LobbyNotFound(LobbyId),
    #[error("no lobby with join code {0}")]
    JoinCodeNotFound(String),
    #[error("objective {0} not found")]
    ObjectiveNotFound(ObjectiveId),

    #[error("player {0} is banned")]
    Banned(PlayerId),
    #[error("player {0} has no team")]
    NoTeam(PlayerId),
    #[error("player {0} is not in lobby {1}")]
    NotInLobby(PlayerId, LobbyId),
    #[error("player {player} is already in lobby {lobby}")]
    AlreadyInLobby { player: PlayerId, lobby: LobbyId },
    #[error("objective {0} is not accessible from the player's lobby")]
    ObjectiveNotAccessible(ObjectiveId),
    #[error("lobby {0} is {1:?} and cannot be joined")]
    LobbyNotJoinable(LobbyId, LobbyStatus),
    #[error("lobby {0} has already finished")]
    LobbyFinished(LobbyId),

    #[error("lobby {0} is full")]
    LobbyFull(LobbyId),
    #[error("team {team:?} is full in lobby {lobby}")]
    TeamFull { lobby: LobbyId, team: Team },

    #[error("join code {0} is already in use")]
    DuplicateJoinCode(String),
    #[error("{0} already exists")]
    Duplicate(String),
    #[error("lobby {lobby} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        lobby: LobbyId,
        from: LobbyStatus,
        to: LobbyStatus,
    },
    #[error("could not allocate a unique join code after {0} attempts")]
    JoinCodeExhausted(usize),
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::InvalidTeam(_)
            | GameError::InvalidPosition { .. }
            | GameError::NoFix
            | GameError::InvalidJoinCode(_)
            | GameError::InvalidInput(_)
            | GameError::FutureTimestamp(_) => ErrorKind::Validation,
            GameError::PlayerNotFound(_)
            | GameError::LobbyNotFound(_)
            | GameError::JoinCodeNotFound(_)
            | GameError::ObjectiveNotFound(_) => ErrorKind::NotFound,
            GameError::Banned(_)
            | GameError::NoTeam(_)
            | GameError::NotInLobby(..)
            | GameError::AlreadyInLobby { .. }
            | GameError::ObjectiveNotAccessible(_)
            | GameError::LobbyNotJoinable(..)
            | GameError::LobbyFinished(_) => ErrorKind::AccessDenied,
            GameError::LobbyFull(_) | GameError::TeamFull { .. } => ErrorKind::Capacity,
            GameError::DuplicateJoinCode(_)
            | GameError::Duplicate(_)
            | GameError::InvalidTransition { .. }
            | GameError::JoinCodeExhausted(_)
            | GameError::Storage(_) => ErrorKind::Conflict,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::AccessDenied => StatusCode::FORBIDDEN,
            ErrorKind::Capacity | ErrorKind::Conflict => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (self.status_code(), body).into_response()
    }
}
