use super::GameEngine;
use crate::clock::Clock;
use crate::error::GameError;
use crate::lobby::{Lobby, LobbyId, LobbyStatus, Player, Team};
use crate::repository::Repository;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Attempts at inserting a private lobby before giving up on code clashes.
const CODE_INSERT_RETRIES: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Headcount {
    pub red: u32,
    pub blue: u32,
    pub unassigned: u32,
}

impl Headcount {
    pub fn of<R: Repository + ?Sized>(repo: &R, lobby_id: &LobbyId) -> Self {
        repo.players_in_lobby(lobby_id)
            .into_iter()
            .fold(Headcount::default(), |mut heads, player| {
                match player.team {
                    Some(Team::Red) => heads.red += 1,
                    Some(Team::Blue) => heads.blue += 1,
                    None => heads.unassigned += 1,
                }
                heads
            })
    }

    pub fn for_team(&self, team: Team) -> u32 {
        match team {
            Team::Red => self.red,
            Team::Blue => self.blue,
        }
    }

    pub fn total(&self) -> u32 {
        self.red + self.blue + self.unassigned
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinOutcome {
    pub lobby: Lobby,
    /// False when the player was already a member.
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaveOutcome {
    pub left_lobby: Option<LobbyId>,
    pub match_voided: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamAssignment {
    pub team: Team,
    pub changed: bool,
    pub lobby: Lobby,
}

fn active_player<'a, R: Repository>(repo: &'a R, player_id: &str) -> Result<&'a Player, GameError> {
    let player = repo
        .player(player_id)
        .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
    if player.banned {
        return Err(GameError::Banned(player_id.to_string()));
    }
    Ok(player)
}

impl<R: Repository, C: Clock> GameEngine<R, C> {
    pub fn create_lobby(&self, is_private: bool) -> Result<Lobby, GameError> {
        let mut repo = self.write()?;
        let now = self.clock.now();
        self.create_lobby_locked(&mut repo, is_private, now)
    }

    fn create_lobby_locked(
        &self,
        repo: &mut R,
        is_private: bool,
        now: DateTime<Utc>,
    ) -> Result<Lobby, GameError> {
        if !is_private {
            let lobby = Lobby::new(false, None, now);
            repo.insert_lobby(lobby.clone())?;
            info!(lobby_id = %lobby.id, "public lobby created");
            return Ok(lobby);
        }

        let mut rng = rand::thread_rng();
        for attempt in 1..=CODE_INSERT_RETRIES {
            let code = self
                .codes
                .generate(&mut rng, |code| repo.lobby_by_code(code).is_some())?;
            let lobby = Lobby::new(true, Some(code), now);
            match repo.insert_lobby(lobby.clone()) {
                Ok(()) => {
                    info!(lobby_id = %lobby.id, join_code = ?lobby.join_code, "private lobby created");
                    return Ok(lobby);
                }
                Err(GameError::DuplicateJoinCode(code)) => {
                    warn!(attempt, %code, "join code taken at insert, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(GameError::JoinCodeExhausted(CODE_INSERT_RETRIES))
    }

    /// First WAITING public lobby with a free seat, in creation order, or a
    /// fresh one when none qualifies.
    pub fn find_or_create_public_lobby(&self) -> Result<Lobby, GameError> {
        let mut repo = self.write()?;
        let now = self.clock.now();
        self.find_or_create_public_locked(&mut repo, now)
    }

    fn find_or_create_public_locked(
        &self,
        repo: &mut R,
        now: DateTime<Utc>,
    ) -> Result<Lobby, GameError> {
        let existing = repo
            .lobbies()
            .into_iter()
            .find(|l| {
                !l.is_private
                    && l.status == LobbyStatus::Waiting
                    && l.player_count < self.config.max_players
            })
            .cloned();
        match existing {
            Some(lobby) => Ok(lobby),
            None => self.create_lobby_locked(repo, false, now),
        }
    }

    /// Finds a public lobby and joins it in one step.
    pub fn quick_join(&self, player_id: &str) -> Result<JoinOutcome, GameError> {
        let mut repo = self.write()?;
        let now = self.clock.now();
        let player = active_player(&*repo, player_id)?;
        if let Some(current) = player.lobby_id {
            return Err(GameError::AlreadyInLobby {
                player: player_id.to_string(),
                lobby: current,
            });
        }
        let lobby = self.find_or_create_public_locked(&mut repo, now)?;
        self.join_locked(&mut repo, player_id, &lobby.id, now)
    }

    /// Creates a private lobby with a fresh join code and seats its creator.
    pub fn create_private_lobby(&self, player_id: &str) -> Result<JoinOutcome, GameError> {
        let mut repo = self.write()?;
        let now = self.clock.now();
        let player = active_player(&*repo, player_id)?;
        if let Some(current) = player.lobby_id {
            return Err(GameError::AlreadyInLobby {
                player: player_id.to_string(),
                lobby: current,
            });
        }
        let lobby = self.create_lobby_locked(&mut repo, true, now)?;
        self.join_locked(&mut repo, player_id, &lobby.id, now)
    }

    pub fn join_by_code(&self, player_id: &str, code: &str) -> Result<JoinOutcome, GameError> {
        let code = self.codes.normalize(code)?;
        let mut repo = self.write()?;
        let now = self.clock.now();
        let lobby_id = repo
            .lobby_by_code(&code)
            .map(|l| l.id)
            .ok_or(GameError::JoinCodeNotFound(code))?;
        self.join_locked(&mut repo, player_id, &lobby_id, now)
    }

    pub fn join(&self, player_id: &str, lobby_id: &LobbyId) -> Result<JoinOutcome, GameError> {
        let mut repo = self.write()?;
        let now = self.clock.now();
        self.join_locked(&mut repo, player_id, lobby_id, now)
    }

    fn join_locked(
        &self,
        repo: &mut R,
        player_id: &str,
        lobby_id: &LobbyId,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome, GameError> {
        let current = active_player(repo, player_id)?.lobby_id;
        if repo.lobby(lobby_id).is_none() {
            return Err(GameError::LobbyNotFound(*lobby_id));
        }
        self.expire_if_due(repo, lobby_id, now)?;

        let lobby = repo
            .lobby(lobby_id)
            .ok_or(GameError::LobbyNotFound(*lobby_id))?;
        match current {
            Some(current) if current == *lobby_id => {
                return Ok(JoinOutcome {
                    lobby: lobby.clone(),
                    changed: false,
                });
            }
            Some(current) => {
                return Err(GameError::AlreadyInLobby {
                    player: player_id.to_string(),
                    lobby: current,
                });
            }
            None => {}
        }
        if !lobby.status.is_joinable() {
            return Err(GameError::LobbyNotJoinable(*lobby_id, lobby.status));
        }
        if lobby.player_count >= self.config.max_players {
            return Err(GameError::LobbyFull(*lobby_id));
        }

        if let Some(player) = repo.player_mut(player_id) {
            player.enter_lobby(*lobby_id);
        }
        if let Some(lobby) = repo.lobby_mut(lobby_id) {
            lobby.player_count += 1;
        }
        debug!(player_id, lobby_id = %lobby_id, "player joined lobby");

        self.maybe_start(repo, lobby_id, now)?;
        let lobby = repo
            .lobby(lobby_id)
            .cloned()
            .ok_or(GameError::LobbyNotFound(*lobby_id))?;
        Ok(JoinOutcome {
            lobby,
            changed: true,
        })
    }

    /// Leaving while in no lobby succeeds without effect.
    pub fn leave(&self, player_id: &str) -> Result<LeaveOutcome, GameError> {
        let mut repo = self.write()?;
        active_player(&*repo, player_id)?;
        self.leave_locked(&mut repo, player_id)
    }

    pub(super) fn leave_locked(
        &self,
        repo: &mut R,
        player_id: &str,
    ) -> Result<LeaveOutcome, GameError> {
        let now = self.clock.now();
        let player = repo
            .player_mut(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        let Some(lobby_id) = player.lobby_id else {
            return Ok(LeaveOutcome {
                left_lobby: None,
                match_voided: false,
            });
        };
        let team = player.team;
        player.clear_lobby();

        if let Some(lobby) = repo.lobby_mut(&lobby_id) {
            lobby.player_count = lobby.player_count.saturating_sub(1);
        }
        debug!(player_id, lobby_id = %lobby_id, ?team, "player left lobby");

        // a match that already ran out of time finishes instead of voiding
        self.expire_if_due(repo, &lobby_id, now)?;
        let match_voided = self.void_if_starved(repo, &lobby_id, team, now)?;
        Ok(LeaveOutcome {
            left_lobby: Some(lobby_id),
            match_voided,
        })
    }

    pub fn assign_team(
        &self,
        player_id: &str,
        lobby_id: &LobbyId,
        team: Team,
    ) -> Result<TeamAssignment, GameError> {
        let mut repo = self.write()?;
        let now = self.clock.now();

        let player = active_player(&*repo, player_id)?;
        let current_team = player.team;
        if player.lobby_id != Some(*lobby_id) {
            if repo.lobby(lobby_id).is_none() {
                return Err(GameError::LobbyNotFound(*lobby_id));
            }
            return Err(GameError::NotInLobby(player_id.to_string(), *lobby_id));
        }

        self.expire_if_due(&mut repo, lobby_id, now)?;
        let lobby = repo
            .lobby(lobby_id)
            .ok_or(GameError::LobbyNotFound(*lobby_id))?;
        if lobby.status == LobbyStatus::Finished {
            return Err(GameError::LobbyFinished(*lobby_id));
        }
        if current_team == Some(team) {
            return Ok(TeamAssignment {
                team,
                changed: false,
                lobby: lobby.clone(),
            });
        }
        if Headcount::of(&*repo, lobby_id).for_team(team) >= self.config.team_size_limit {
            return Err(GameError::TeamFull {
                lobby: *lobby_id,
                team,
            });
        }

        if let Some(player) = repo.player_mut(player_id) {
            player.team = Some(team);
        }
        debug!(player_id, lobby_id = %lobby_id, ?team, "team assigned");

        self.maybe_start(&mut repo, lobby_id, now)?;
        let lobby = repo
            .lobby(lobby_id)
            .cloned()
            .ok_or(GameError::LobbyNotFound(*lobby_id))?;
        Ok(TeamAssignment {
            team,
            changed: true,
            lobby,
        })
    }

    pub fn headcount(&self, lobby_id: &LobbyId) -> Result<Headcount, GameError> {
        let repo = self.read()?;
        if repo.lobby(lobby_id).is_none() {
            return Err(GameError::LobbyNotFound(*lobby_id));
        }
        Ok(Headcount::of(&*repo, lobby_id))
    }
}
