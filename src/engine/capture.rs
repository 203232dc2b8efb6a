use super::GameEngine;
use crate::clock::Clock;
use crate::error::GameError;
use crate::lobby::{CaptureRecord, Lobby, LobbyStatus, Objective, ObjectiveId, Owner, Winner};
use crate::repository::Repository;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct CaptureOutcome {
    pub objective: Objective,
    pub already_owned: bool,
    /// Lobby state after the capture, for lobby-scoped objectives.
    pub lobby: Option<Lobby>,
    /// Set when this capture ended the match.
    pub winner: Option<Winner>,
}

impl<R: Repository, C: Clock> GameEngine<R, C> {
    /// Credits `objective_id` to the player's team. Record, ownership,
    /// counters and the threshold check all happen under one write lock.
    pub fn capture(
        &self,
        player_id: &str,
        objective_id: ObjectiveId,
    ) -> Result<CaptureOutcome, GameError> {
        let mut repo = self.write()?;
        let now = self.clock.now();

        let player = repo
            .player(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        if player.banned {
            return Err(GameError::Banned(player_id.to_string()));
        }
        let team = player
            .team
            .ok_or_else(|| GameError::NoTeam(player_id.to_string()))?;
        let player_lobby = player.lobby_id;

        let objective = repo
            .objective(objective_id)
            .ok_or(GameError::ObjectiveNotFound(objective_id))?;
        let scope = objective.lobby_id;
        if let Some(lobby_id) = scope {
            if player_lobby != Some(lobby_id) {
                return Err(GameError::ObjectiveNotAccessible(objective_id));
            }
            self.expire_if_due(&mut repo, &lobby_id, now)?;
            let lobby = repo
                .lobby(&lobby_id)
                .ok_or(GameError::LobbyNotFound(lobby_id))?;
            if lobby.status == LobbyStatus::Finished {
                return Err(GameError::LobbyFinished(lobby_id));
            }
        }

        let objective = repo
            .objective(objective_id)
            .ok_or(GameError::ObjectiveNotFound(objective_id))?;
        if objective.owner_team == Owner::from(team) {
            return Ok(CaptureOutcome {
                objective: objective.clone(),
                already_owned: true,
                lobby: scope.and_then(|id| repo.lobby(&id).cloned()),
                winner: None,
            });
        }

        let transfer = self.transfer_locked(&mut repo, objective_id, team.into(), now)?;
        repo.append_capture(CaptureRecord {
            player_id: player_id.to_string(),
            objective_id,
            lobby_id: scope,
            team,
            captured_at: now,
        });
        debug!(
            player_id,
            objective_id,
            ?team,
            previous = ?transfer.previous_owner,
            "objective captured"
        );

        let winner = match scope {
            Some(lobby_id) => self.check_threshold(&mut repo, &lobby_id, now)?,
            None => None,
        };
        Ok(CaptureOutcome {
            objective: transfer.objective,
            already_owned: false,
            lobby: scope.and_then(|id| repo.lobby(&id).cloned()),
            winner,
        })
    }
}
