use crate::error::GameError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

pub type PlayerId = String;
pub type LobbyId = Uuid;
pub type ObjectiveId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Team {
    Red,
    Blue,
}

impl FromStr for Team {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RED" => Ok(Team::Red),
            "BLUE" => Ok(Team::Blue),
            _ => Err(GameError::InvalidTeam(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Owner {
    #[default]
    Neutral,
    Red,
    Blue,
}

impl Owner {
    pub fn team(self) -> Option<Team> {
        match self {
            Owner::Neutral => None,
            Owner::Red => Some(Team::Red),
            Owner::Blue => Some(Team::Blue),
        }
    }
}

impl From<Team> for Owner {
    fn from(team: Team) -> Self {
        match team {
            Team::Red => Owner::Red,
            Team::Blue => Owner::Blue,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Winner {
    Red,
    Blue,
    Draw,
}

impl From<Team> for Winner {
    fn from(team: Team) -> Self {
        match team {
            Team::Red => Winner::Red,
            Team::Blue => Winner::Blue,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LobbyStatus {
    Waiting,
    Active,
    Finished,
}

impl LobbyStatus {
    /// Allowed edges of the lobby state machine. `Active -> Waiting` only
    /// happens when a match is voided for lack of players.
    pub fn can_transition_to(self, next: LobbyStatus) -> bool {
        matches!(
            (self, next),
            (LobbyStatus::Waiting, LobbyStatus::Active)
                | (LobbyStatus::Active, LobbyStatus::Finished)
                | (LobbyStatus::Active, LobbyStatus::Waiting)
        )
    }

    pub fn is_joinable(self) -> bool {
        matches!(self, LobbyStatus::Waiting | LobbyStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Lobby {
    pub id: LobbyId,
    pub status: LobbyStatus,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_code: Option<String>,
    pub player_count: u32,
    pub targets_red: u32,
    pub targets_blue: u32,
    pub created_at: DateTime<Utc>,
    pub match_start_time: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub winner_team: Option<Winner>,
}

impl Lobby {
    pub fn new(is_private: bool, join_code: Option<String>, now: DateTime<Utc>) -> Self {
        Lobby {
            id: Uuid::new_v4(),
            status: LobbyStatus::Waiting,
            is_private,
            join_code,
            player_count: 0,
            targets_red: 0,
            targets_blue: 0,
            created_at: now,
            match_start_time: None,
            finished_at: None,
            winner_team: None,
        }
    }

    pub fn targets_of(&self, team: Team) -> u32 {
        match team {
            Team::Red => self.targets_red,
            Team::Blue => self.targets_blue,
        }
    }

    pub(crate) fn counter_mut(&mut self, team: Team) -> &mut u32 {
        match team {
            Team::Red => &mut self.targets_red,
            Team::Blue => &mut self.targets_blue,
        }
    }

    pub(crate) fn reset_counters(&mut self) {
        self.targets_red = 0;
        self.targets_blue = 0;
    }

    /// Moves the lobby along one edge of the state machine, keeping the
    /// timing and winner fields consistent with the new status.
    pub(crate) fn transition(
        &mut self,
        next: LobbyStatus,
        now: DateTime<Utc>,
        winner: Option<Winner>,
    ) -> Result<(), GameError> {
        if !self.status.can_transition_to(next) {
            return Err(GameError::InvalidTransition {
                lobby: self.id,
                from: self.status,
                to: next,
            });
        }
        match next {
            LobbyStatus::Active => {
                self.match_start_time = Some(now);
                self.winner_team = None;
                self.finished_at = None;
            }
            LobbyStatus::Finished => {
                self.finished_at = Some(now);
                self.winner_team = Some(winner.unwrap_or(Winner::Draw));
            }
            LobbyStatus::Waiting => {
                self.match_start_time = None;
                self.winner_team = None;
            }
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub lobby_id: Option<LobbyId>,
    pub team: Option<Team>,
    pub lat: f64,
    pub lon: f64,
    pub last_active: Option<DateTime<Utc>>,
    pub banned: bool,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>) -> Self {
        Player {
            id: id.into(),
            lobby_id: None,
            team: None,
            lat: 0.0,
            lon: 0.0,
            last_active: None,
            banned: false,
        }
    }

    /// `(0, 0)` means no position has been accepted yet.
    pub fn has_fix(&self) -> bool {
        !(self.lat == 0.0 && self.lon == 0.0)
    }

    pub(crate) fn enter_lobby(&mut self, lobby: LobbyId) {
        self.lobby_id = Some(lobby);
        self.team = None;
    }

    pub(crate) fn clear_lobby(&mut self) {
        self.lobby_id = None;
        self.team = None;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Objective {
    pub id: ObjectiveId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub owner_team: Owner,
    pub lobby_id: Option<LobbyId>,
    pub last_captured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptureRecord {
    pub player_id: PlayerId,
    pub objective_id: ObjectiveId,
    pub lobby_id: Option<LobbyId>,
    pub team: Team,
    pub captured_at: DateTime<Utc>,
}
