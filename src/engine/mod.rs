//! The match engine: lobby lifecycle, roster, objectives, captures and the
//! live position feed, all serialized through one repository lock.

mod capture;
mod lifecycle;
mod objectives;
mod positions;
mod roster;

pub use capture::CaptureOutcome;
pub use lifecycle::decide_winner;
pub use objectives::{TransferOutcome, LOBBY_OBJECTIVE_COUNT, MAX_RANDOM_OBJECTIVES};
pub use positions::{ActivePlayer, PositionAck, RosterEntry, MAX_CLOCK_SKEW_SECS};
pub use roster::{Headcount, JoinOutcome, LeaveOutcome, TeamAssignment};

use crate::clock::{Clock, SystemClock};
use crate::error::GameError;
use crate::join_code::JoinCodeGenerator;
use crate::lobby::{Lobby, LobbyId, LobbyStatus, Owner, Player, Winner};
use crate::repository::{MemoryRepository, Repository};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub match_duration: Duration,
    pub win_threshold: u32,
    pub team_size_limit: u32,
    pub max_players: u32,
    /// Freshness window of the global live map.
    pub active_window: Duration,
    /// Freshness window of the per-lobby roster.
    pub lobby_active_window: Duration,
    pub join_code_length: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            match_duration: Duration::seconds(300),
            win_threshold: 10,
            team_size_limit: 10,
            max_players: 20,
            active_window: Duration::seconds(10),
            lobby_active_window: Duration::seconds(20),
            join_code_length: crate::join_code::DEFAULT_CODE_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbyView {
    #[serde(flatten)]
    pub lobby: Lobby,
    pub headcount: Headcount,
    pub time_remaining_secs: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub lobby_id: LobbyId,
    pub status: LobbyStatus,
    pub winner_team: Option<Winner>,
    pub targets_red: u32,
    pub targets_blue: u32,
    pub targets_neutral: u32,
    pub total_targets: u32,
    pub captures: usize,
    pub match_start_time: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedLobby {
    pub lobby_id: LobbyId,
    pub players_detached: usize,
    pub objectives_removed: usize,
}

pub struct GameEngine<R: Repository = MemoryRepository, C: Clock = SystemClock> {
    repo: RwLock<R>,
    clock: C,
    config: GameConfig,
    codes: JoinCodeGenerator,
}

/// Upper bound for every configured duration.
const MAX_CONFIG_HOURS: i64 = 24;

impl GameConfig {
    /// Rejects settings the engine cannot run with: empty caps, a zero
    /// threshold, and durations that are not positive or exceed a day.
    pub fn validate(&self) -> Result<(), GameError> {
        let durations = [
            ("match_duration", self.match_duration),
            ("active_window", self.active_window),
            ("lobby_active_window", self.lobby_active_window),
        ];
        for (name, value) in durations {
            if value <= Duration::zero() || value > Duration::hours(MAX_CONFIG_HOURS) {
                return Err(GameError::InvalidInput(format!(
                    "{name} must be between 1 second and {MAX_CONFIG_HOURS} hours"
                )));
            }
        }
        if self.win_threshold == 0 {
            return Err(GameError::InvalidInput("win_threshold must be at least 1".into()));
        }
        if self.team_size_limit == 0 {
            return Err(GameError::InvalidInput("team_size_limit must be at least 1".into()));
        }
        if self.max_players < 2 {
            return Err(GameError::InvalidInput("max_players must be at least 2".into()));
        }
        Ok(())
    }
}

impl GameEngine {
    pub fn in_memory(config: GameConfig) -> Result<Self, GameError> {
        GameEngine::new(MemoryRepository::new(), SystemClock, config)
    }
}

impl<R: Repository, C: Clock> GameEngine<R, C> {
    pub fn new(repo: R, clock: C, config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;
        let codes = JoinCodeGenerator::with_length(config.join_code_length)?;
        Ok(GameEngine {
            repo: RwLock::new(repo),
            clock,
            config,
            codes,
        })
    }

    /// Replaces the join code generator, e.g. with a smaller alphabet.
    pub fn with_code_generator(mut self, codes: JoinCodeGenerator) -> Self {
        self.codes = codes;
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, R>, GameError> {
        self.repo
            .read()
            .map_err(|_| GameError::Storage("repository lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, R>, GameError> {
        self.repo
            .write()
            .map_err(|_| GameError::Storage("repository lock poisoned".into()))
    }

    /// Registers a player id handed over by the identity layer. Idempotent.
    pub fn ensure_player(&self, player_id: &str) -> Result<Player, GameError> {
        if player_id.trim().is_empty() {
            return Err(GameError::InvalidInput("empty player id".into()));
        }
        let mut repo = self.write()?;
        if let Some(player) = repo.player(player_id) {
            return Ok(player.clone());
        }
        let player = Player::new(player_id);
        repo.insert_player(player.clone())?;
        tracing::debug!(player_id, "registered player");
        Ok(player)
    }

    pub fn player(&self, player_id: &str) -> Result<Player, GameError> {
        let repo = self.read()?;
        repo.player(player_id)
            .cloned()
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))
    }

    /// Administrative ban switch. A banned player is taken out of their
    /// lobby under the same rules as a voluntary leave.
    pub fn set_banned(&self, player_id: &str, banned: bool) -> Result<Player, GameError> {
        let mut repo = self.write()?;
        let player = repo
            .player(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        if banned && player.lobby_id.is_some() {
            self.leave_locked(&mut repo, player_id)?;
        }
        let player = repo
            .player_mut(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        player.banned = banned;
        info!(player_id, banned, "player ban flag updated");
        Ok(player.clone())
    }

    /// Current lobby state. Completes the match first if its time is up.
    pub fn lobby_status(&self, lobby_id: &LobbyId) -> Result<LobbyView, GameError> {
        let mut repo = self.write()?;
        let now = self.clock.now();
        self.expire_if_due(&mut repo, lobby_id, now)?;

        let lobby = repo
            .lobby(lobby_id)
            .cloned()
            .ok_or(GameError::LobbyNotFound(*lobby_id))?;
        let time_remaining_secs = match (lobby.status, lobby.match_start_time) {
            (LobbyStatus::Active, Some(start)) => {
                let left = start + self.config.match_duration - now;
                Some(left.num_seconds().max(0))
            }
            _ => None,
        };
        Ok(LobbyView {
            headcount: Headcount::of(&*repo, lobby_id),
            lobby,
            time_remaining_secs,
        })
    }

    pub fn match_summary(&self, lobby_id: &LobbyId) -> Result<MatchSummary, GameError> {
        let mut repo = self.write()?;
        let now = self.clock.now();
        self.expire_if_due(&mut repo, lobby_id, now)?;

        let lobby = repo
            .lobby(lobby_id)
            .ok_or(GameError::LobbyNotFound(*lobby_id))?;
        let objectives = repo.objectives_in_scope(Some(lobby_id));
        let targets_neutral = objectives
            .iter()
            .filter(|o| o.owner_team == Owner::Neutral)
            .count() as u32;
        let captures = repo
            .captures()
            .iter()
            .filter(|c| c.lobby_id.as_ref() == Some(lobby_id))
            .filter(|c| lobby.match_start_time.map_or(false, |start| c.captured_at >= start))
            .count();

        Ok(MatchSummary {
            lobby_id: lobby.id,
            status: lobby.status,
            winner_team: lobby.winner_team,
            targets_red: lobby.targets_red,
            targets_blue: lobby.targets_blue,
            targets_neutral,
            total_targets: objectives.len() as u32,
            captures,
            match_start_time: lobby.match_start_time,
            finished_at: lobby.finished_at,
        })
    }

    /// Public lobbies a player could join right now, in creation order.
    pub fn list_joinable_lobbies(&self) -> Result<Vec<Lobby>, GameError> {
        let mut repo = self.write()?;
        let now = self.clock.now();
        self.expire_all_due(&mut repo, now)?;

        Ok(repo
            .lobbies()
            .into_iter()
            .filter(|l| {
                !l.is_private && l.status.is_joinable() && l.player_count < self.config.max_players
            })
            .cloned()
            .collect())
    }

    /// Administrative removal. Members are detached and the lobby's
    /// objectives go with it; capture records are kept.
    pub fn delete_lobby(&self, lobby_id: &LobbyId) -> Result<DeletedLobby, GameError> {
        let mut repo = self.write()?;
        if repo.lobby(lobby_id).is_none() {
            return Err(GameError::LobbyNotFound(*lobby_id));
        }

        let members: Vec<String> = repo
            .players_in_lobby(lobby_id)
            .into_iter()
            .map(|p| p.id.clone())
            .collect();
        for id in &members {
            if let Some(player) = repo.player_mut(id) {
                player.clear_lobby();
            }
        }
        let objectives_removed = repo.remove_objectives_in_lobby(lobby_id);
        repo.remove_lobby(lobby_id);

        info!(lobby_id = %lobby_id, players = members.len(), objectives_removed, "lobby deleted");
        Ok(DeletedLobby {
            lobby_id: *lobby_id,
            players_detached: members.len(),
            objectives_removed,
        })
    }

    /// Finishes every ACTIVE lobby whose time is up. Returns how many flipped.
    pub fn sweep_expired(&self) -> Result<usize, GameError> {
        let mut repo = self.write()?;
        let now = self.clock.now();
        self.expire_all_due(&mut repo, now)
    }
}
