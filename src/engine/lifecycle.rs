use super::GameEngine;
use crate::clock::Clock;
use crate::engine::roster::Headcount;
use crate::error::GameError;
use crate::lobby::{LobbyId, LobbyStatus, Team, Winner};
use crate::repository::Repository;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Team with strictly more objectives wins; equal counts draw.
pub fn decide_winner(targets_red: u32, targets_blue: u32) -> Winner {
    match targets_red.cmp(&targets_blue) {
        std::cmp::Ordering::Greater => Winner::Red,
        std::cmp::Ordering::Less => Winner::Blue,
        std::cmp::Ordering::Equal => Winner::Draw,
    }
}

impl<R: Repository, C: Clock> GameEngine<R, C> {
    /// WAITING -> ACTIVE once the team-size policy holds. Public lobbies need
    /// a player on each side, private ones two players in total.
    pub(super) fn maybe_start(
        &self,
        repo: &mut R,
        lobby_id: &LobbyId,
        now: DateTime<Utc>,
    ) -> Result<bool, GameError> {
        let lobby = repo
            .lobby(lobby_id)
            .ok_or(GameError::LobbyNotFound(*lobby_id))?;
        if lobby.status != LobbyStatus::Waiting {
            return Ok(false);
        }

        let heads = Headcount::of(repo, lobby_id);
        let ready = if lobby.is_private {
            heads.total() >= 2
        } else {
            heads.red >= 1 && heads.blue >= 1
        };
        if !ready {
            return Ok(false);
        }

        let seeded = self.seed_lobby_objectives(repo, lobby_id)?;
        let lobby = repo
            .lobby_mut(lobby_id)
            .ok_or(GameError::LobbyNotFound(*lobby_id))?;
        lobby.transition(LobbyStatus::Active, now, None)?;
        info!(
            lobby_id = %lobby_id,
            private = lobby.is_private,
            red = heads.red,
            blue = heads.blue,
            objectives = seeded.len(),
            "match started"
        );
        Ok(true)
    }

    /// ACTIVE -> FINISHED when the match clock has run out. Safe to call on
    /// any lobby at any time; it does nothing unless the match is due.
    pub(super) fn expire_if_due(
        &self,
        repo: &mut R,
        lobby_id: &LobbyId,
        now: DateTime<Utc>,
    ) -> Result<bool, GameError> {
        let Some(lobby) = repo.lobby_mut(lobby_id) else {
            return Ok(false);
        };
        if lobby.status != LobbyStatus::Active {
            return Ok(false);
        }
        let Some(start) = lobby.match_start_time else {
            return Ok(false);
        };
        if now - start < self.config.match_duration {
            return Ok(false);
        }

        let winner = decide_winner(lobby.targets_red, lobby.targets_blue);
        lobby.transition(LobbyStatus::Finished, now, Some(winner))?;
        info!(
            lobby_id = %lobby_id,
            ?winner,
            red = lobby.targets_red,
            blue = lobby.targets_blue,
            "match finished on time"
        );
        Ok(true)
    }

    pub(super) fn expire_all_due(&self, repo: &mut R, now: DateTime<Utc>) -> Result<usize, GameError> {
        let active: Vec<LobbyId> = repo
            .lobbies()
            .into_iter()
            .filter(|l| l.status == LobbyStatus::Active)
            .map(|l| l.id)
            .collect();
        let mut finished = 0;
        for id in &active {
            if self.expire_if_due(repo, id, now)? {
                finished += 1;
            }
        }
        Ok(finished)
    }

    /// Immediate win once a team's counter reaches the threshold. Must only
    /// run after the ownership transfer has been applied.
    pub(super) fn check_threshold(
        &self,
        repo: &mut R,
        lobby_id: &LobbyId,
        now: DateTime<Utc>,
    ) -> Result<Option<Winner>, GameError> {
        let lobby = repo
            .lobby_mut(lobby_id)
            .ok_or(GameError::LobbyNotFound(*lobby_id))?;
        if lobby.status != LobbyStatus::Active {
            return Ok(None);
        }

        let threshold = self.config.win_threshold;
        let winner = [Team::Red, Team::Blue]
            .into_iter()
            .find(|team| lobby.targets_of(*team) >= threshold)
            .map(Winner::from);
        if let Some(winner) = winner {
            lobby.transition(LobbyStatus::Finished, now, Some(winner))?;
            info!(
                lobby_id = %lobby_id,
                ?winner,
                red = lobby.targets_red,
                blue = lobby.targets_blue,
                "match won by capture threshold"
            );
        }
        Ok(winner)
    }

    /// Voids an ACTIVE match after a leave emptied the leaver's team in a
    /// public lobby, or left a private lobby with fewer than two players.
    /// Lobby objectives are dropped and the lobby goes back to WAITING.
    pub(super) fn void_if_starved(
        &self,
        repo: &mut R,
        lobby_id: &LobbyId,
        left_team: Option<Team>,
        now: DateTime<Utc>,
    ) -> Result<bool, GameError> {
        let Some(lobby) = repo.lobby(lobby_id) else {
            return Ok(false);
        };
        if lobby.status != LobbyStatus::Active {
            return Ok(false);
        }

        // voiding mirrors the start policy of the lobby kind
        let heads = Headcount::of(repo, lobby_id);
        let starved = if lobby.is_private {
            heads.total() < 2
        } else {
            left_team.is_some_and(|team| heads.for_team(team) == 0)
        };
        if !starved {
            return Ok(false);
        }

        let removed = repo.remove_objectives_in_lobby(lobby_id);
        let lobby = repo
            .lobby_mut(lobby_id)
            .ok_or(GameError::LobbyNotFound(*lobby_id))?;
        lobby.transition(LobbyStatus::Waiting, now, None)?;
        lobby.reset_counters();
        warn!(
            lobby_id = %lobby_id,
            red = heads.red,
            blue = heads.blue,
            objectives_removed = removed,
            "match voided, not enough players"
        );
        Ok(true)
    }
}
