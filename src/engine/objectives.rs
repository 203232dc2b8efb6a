use super::GameEngine;
use crate::clock::Clock;
use crate::error::GameError;
use crate::geo::{self, GeoBounds, GeoPoint};
use crate::lobby::{Lobby, LobbyId, Objective, ObjectiveId, Owner};
use crate::repository::Repository;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::f64::consts::PI;
use tracing::{debug, info};

pub const MAX_RANDOM_OBJECTIVES: usize = 500;

/// Anchor of the per-lobby cluster (Piazza del Duomo, Milan).
const CLUSTER_CENTER: GeoPoint = GeoPoint::new(45.4641, 9.1919);
/// Distances of the cluster points from the anchor, in kilometres.
const CLUSTER_OFFSETS_KM: [f64; 5] = [0.08, 0.12, 0.16, 0.2, 0.25];

const LANDMARKS: [(&str, f64, f64); 15] = [
    ("Duomo di Milano", 45.4641, 9.1919),
    ("Castello Sforzesco", 45.4705, 9.1793),
    ("Stazione Centrale", 45.4859, 9.2035),
    ("Arco della Pace", 45.4754, 9.1724),
    ("Politecnico di Milano", 45.4790, 9.2274),
    ("Galleria Vittorio Emanuele II", 45.4659, 9.1900),
    ("Teatro alla Scala", 45.4674, 9.1895),
    ("Basilica di Sant'Ambrogio", 45.4623, 9.1757),
    ("Santa Maria delle Grazie", 45.4659, 9.1709),
    ("Darsena dei Navigli", 45.4525, 9.1776),
    ("Colonne di San Lorenzo", 45.4580, 9.1813),
    ("Pinacoteca di Brera", 45.4719, 9.1880),
    ("Piazza Gae Aulenti", 45.4840, 9.1899),
    ("Cimitero Monumentale", 45.4856, 9.1797),
    ("Universita Bocconi", 45.4504, 9.1896),
];

/// Global objectives created when the server starts with none.
const GLOBAL_BOOTSTRAP: usize = 5;

pub const LOBBY_OBJECTIVE_COUNT: usize = CLUSTER_OFFSETS_KM.len() + LANDMARKS.len();

#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    pub objective: Objective,
    pub previous_owner: Owner,
    /// False when the objective already had the requested owner.
    pub changed: bool,
}

/// The fixed objective layout every lobby match is played on.
fn lobby_layout() -> Vec<(String, GeoPoint)> {
    let step = 2.0 * PI / CLUSTER_OFFSETS_KM.len() as f64;
    let cluster = CLUSTER_OFFSETS_KM.iter().enumerate().map(|(i, km)| {
        (
            format!("Cluster Point {}", i + 1),
            CLUSTER_CENTER.destination(*km, step * i as f64),
        )
    });
    let landmarks = LANDMARKS
        .iter()
        .map(|(name, lat, lon)| (name.to_string(), GeoPoint::new(*lat, *lon)));
    cluster.chain(landmarks).collect()
}

fn validate_count(count: usize) -> Result<(), GameError> {
    if count == 0 || count > MAX_RANDOM_OBJECTIVES {
        return Err(GameError::InvalidInput(format!(
            "count must be between 1 and {MAX_RANDOM_OBJECTIVES}"
        )));
    }
    Ok(())
}

impl<R: Repository, C: Clock> GameEngine<R, C> {
    /// Replaces a lobby's objectives with the standard layout, all NEUTRAL,
    /// and zeroes both counters.
    pub fn seed_for_lobby(&self, lobby_id: &LobbyId) -> Result<Vec<Objective>, GameError> {
        let mut repo = self.write()?;
        self.seed_lobby_objectives(&mut repo, lobby_id)
    }

    pub(super) fn seed_lobby_objectives(
        &self,
        repo: &mut R,
        lobby_id: &LobbyId,
    ) -> Result<Vec<Objective>, GameError> {
        if repo.lobby(lobby_id).is_none() {
            return Err(GameError::LobbyNotFound(*lobby_id));
        }

        let objectives: Vec<Objective> = lobby_layout()
            .into_iter()
            .map(|(name, point)| Objective {
                id: repo.next_objective_id(),
                name,
                lat: point.lat,
                lon: point.lon,
                owner_team: Owner::Neutral,
                lobby_id: Some(*lobby_id),
                last_captured_at: None,
            })
            .collect();

        let replaced = repo.remove_objectives_in_lobby(lobby_id);
        for objective in &objectives {
            repo.insert_objective(objective.clone())?;
        }
        if let Some(lobby) = repo.lobby_mut(lobby_id) {
            lobby.reset_counters();
        }
        debug!(lobby_id = %lobby_id, replaced, seeded = objectives.len(), "lobby objectives seeded");
        Ok(objectives)
    }

    /// Global objectives spread uniformly over a disk around `center`.
    pub fn seed_random(
        &self,
        center: GeoPoint,
        radius_km: f64,
        count: usize,
    ) -> Result<Vec<Objective>, GameError> {
        if !center.is_valid() {
            return Err(GameError::InvalidPosition {
                lat: center.lat,
                lon: center.lon,
            });
        }
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(GameError::InvalidInput("radius_km must be positive".into()));
        }
        validate_count(count)?;

        let mut rng = rand::thread_rng();
        let points: Vec<GeoPoint> = (0..count)
            .map(|_| geo::random_point_in_radius(&mut rng, &center, radius_km))
            .collect();
        self.insert_global(points, "Random Objective")
    }

    /// Global objectives scattered uniformly over a lat/lon rectangle.
    pub fn seed_random_in_bounds(
        &self,
        bounds: GeoBounds,
        count: usize,
    ) -> Result<Vec<Objective>, GameError> {
        if !bounds.is_valid() {
            return Err(GameError::InvalidInput("invalid bounding region".into()));
        }
        validate_count(count)?;

        let mut rng = rand::thread_rng();
        let points: Vec<GeoPoint> = (0..count)
            .map(|_| geo::random_point_in_bounds(&mut rng, &bounds))
            .collect();
        self.insert_global(points, "Scattered Objective")
    }

    fn insert_global(&self, points: Vec<GeoPoint>, label: &str) -> Result<Vec<Objective>, GameError> {
        let mut repo = self.write()?;
        let mut created = Vec::with_capacity(points.len());
        for point in points {
            let id = repo.next_objective_id();
            let objective = Objective {
                id,
                name: format!("{label} #{id}"),
                lat: point.lat,
                lon: point.lon,
                owner_team: Owner::Neutral,
                lobby_id: None,
                last_captured_at: None,
            };
            repo.insert_objective(objective.clone())?;
            created.push(objective);
        }
        info!(count = created.len(), "global objectives generated");
        Ok(created)
    }

    /// Seeds a handful of named global objectives if there are none yet.
    pub fn bootstrap_global_objectives(&self) -> Result<usize, GameError> {
        let mut repo = self.write()?;
        if !repo.objectives_in_scope(None).is_empty() {
            return Ok(0);
        }
        for (name, lat, lon) in LANDMARKS.iter().take(GLOBAL_BOOTSTRAP) {
            let objective = Objective {
                id: repo.next_objective_id(),
                name: name.to_string(),
                lat: *lat,
                lon: *lon,
                owner_team: Owner::Neutral,
                lobby_id: None,
                last_captured_at: None,
            };
            repo.insert_objective(objective)?;
        }
        info!(count = GLOBAL_BOOTSTRAP, "global objectives bootstrapped");
        Ok(GLOBAL_BOOTSTRAP)
    }

    pub fn transfer_ownership(
        &self,
        objective_id: ObjectiveId,
        new_owner: Owner,
    ) -> Result<TransferOutcome, GameError> {
        let mut repo = self.write()?;
        let now = self.clock.now();
        self.transfer_locked(&mut repo, objective_id, new_owner, now)
    }

    /// Moves ownership and keeps the lobby counters in step. NEUTRAL is never
    /// counted; decrements stop at zero.
    pub(super) fn transfer_locked(
        &self,
        repo: &mut R,
        objective_id: ObjectiveId,
        new_owner: Owner,
        now: DateTime<Utc>,
    ) -> Result<TransferOutcome, GameError> {
        let objective = repo
            .objective(objective_id)
            .ok_or(GameError::ObjectiveNotFound(objective_id))?;
        let previous_owner = objective.owner_team;
        if previous_owner == new_owner {
            return Ok(TransferOutcome {
                objective: objective.clone(),
                previous_owner,
                changed: false,
            });
        }
        if let Some(lobby_id) = objective.lobby_id {
            if repo.lobby(&lobby_id).is_none() {
                return Err(GameError::LobbyNotFound(lobby_id));
            }
        }

        let objective = repo
            .objective_mut(objective_id)
            .ok_or(GameError::ObjectiveNotFound(objective_id))?;
        objective.owner_team = new_owner;
        objective.last_captured_at = Some(now);
        let objective = objective.clone();

        if let Some(lobby_id) = objective.lobby_id {
            if let Some(lobby) = repo.lobby_mut(&lobby_id) {
                if let Some(team) = previous_owner.team() {
                    let counter = lobby.counter_mut(team);
                    *counter = counter.saturating_sub(1);
                }
                if let Some(team) = new_owner.team() {
                    *lobby.counter_mut(team) += 1;
                }
            }
        }
        Ok(TransferOutcome {
            objective,
            previous_owner,
            changed: true,
        })
    }

    /// Rebuilds both lobby counters from per-objective ownership.
    pub fn recount(&self, lobby_id: &LobbyId) -> Result<Lobby, GameError> {
        let mut repo = self.write()?;
        let (red, blue) = repo.objectives_in_scope(Some(lobby_id)).into_iter().fold(
            (0u32, 0u32),
            |(red, blue), o| match o.owner_team {
                Owner::Red => (red + 1, blue),
                Owner::Blue => (red, blue + 1),
                Owner::Neutral => (red, blue),
            },
        );
        let lobby = repo
            .lobby_mut(lobby_id)
            .ok_or(GameError::LobbyNotFound(*lobby_id))?;
        if lobby.targets_red != red || lobby.targets_blue != blue {
            tracing::warn!(
                lobby_id = %lobby_id,
                live_red = lobby.targets_red,
                live_blue = lobby.targets_blue,
                red,
                blue,
                "target counters drifted, repairing"
            );
        }
        lobby.targets_red = red;
        lobby.targets_blue = blue;
        Ok(lobby.clone())
    }

    /// Lobby objectives for lobby members, global ones for everyone else.
    pub fn visible_objectives(&self, player_id: &str) -> Result<Vec<Objective>, GameError> {
        let repo = self.read()?;
        let player = repo
            .player(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        if player.banned {
            return Err(GameError::Banned(player_id.to_string()));
        }
        Ok(repo
            .objectives_in_scope(player.lobby_id.as_ref())
            .into_iter()
            .cloned()
            .collect())
    }
}
