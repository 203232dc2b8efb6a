use super::GameEngine;
use crate::clock::Clock;
use crate::error::GameError;
use crate::geo::GeoPoint;
use crate::lobby::{LobbyId, Player, PlayerId, Team};
use crate::repository::Repository;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct PositionAck {
    /// False when the report was older than the stored one and ignored.
    pub accepted: bool,
    pub last_active: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivePlayer {
    pub id: PlayerId,
    pub lat: f64,
    pub lon: f64,
    pub team: Option<Team>,
    pub lobby_id: Option<LobbyId>,
    pub last_active: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub team: Option<Team>,
    pub lat: f64,
    pub lon: f64,
    pub is_active: bool,
}

/// How far ahead of the server clock a client timestamp may run before the
/// report is rejected. Reports inside the allowance are pinned to now.
pub const MAX_CLOCK_SKEW_SECS: i64 = 10;

fn is_fresh(player: &Player, now: DateTime<Utc>, window: Duration) -> bool {
    player.has_fix()
        && player
            .last_active
            .is_some_and(|seen| seen <= now && now - seen <= window)
}

impl<R: Repository, C: Clock> GameEngine<R, C> {
    /// Stores a position unless it is the `(0, 0)` sentinel or older than
    /// the last accepted report. `last_active` never runs ahead of the
    /// server clock.
    pub fn report_position(
        &self,
        player_id: &str,
        lat: f64,
        lon: f64,
        client_timestamp: DateTime<Utc>,
    ) -> Result<PositionAck, GameError> {
        let point = GeoPoint::new(lat, lon);
        if !point.is_valid() {
            return Err(GameError::InvalidPosition { lat, lon });
        }
        if lat == 0.0 && lon == 0.0 {
            return Err(GameError::NoFix);
        }

        let now = self.clock.now();
        if client_timestamp - now > Duration::seconds(MAX_CLOCK_SKEW_SECS) {
            return Err(GameError::FutureTimestamp(client_timestamp));
        }
        let client_timestamp = client_timestamp.min(now);

        let mut repo = self.write()?;
        let player = repo
            .player_mut(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        if player.banned {
            return Err(GameError::Banned(player_id.to_string()));
        }

        if player
            .last_active
            .is_some_and(|last| client_timestamp < last)
        {
            debug!(player_id, %client_timestamp, "stale position report ignored");
            return Ok(PositionAck {
                accepted: false,
                last_active: player.last_active,
            });
        }

        player.lat = lat;
        player.lon = lon;
        player.last_active = Some(client_timestamp);
        Ok(PositionAck {
            accepted: true,
            last_active: player.last_active,
        })
    }

    /// Non-banned players with a real fix reported within `window` of now.
    pub fn active_players(&self, window: Duration) -> Result<Vec<ActivePlayer>, GameError> {
        let repo = self.read()?;
        let now = self.clock.now();
        let mut active: Vec<ActivePlayer> = repo
            .players()
            .into_iter()
            .filter(|p| !p.banned && is_fresh(p, now, window))
            .filter_map(|p| {
                Some(ActivePlayer {
                    id: p.id.clone(),
                    lat: p.lat,
                    lon: p.lon,
                    team: p.team,
                    lobby_id: p.lobby_id,
                    last_active: p.last_active?,
                })
            })
            .collect();
        active.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(active)
    }

    /// Members of a lobby with their freshness under the lobby window.
    pub fn lobby_roster(&self, lobby_id: &LobbyId) -> Result<Vec<RosterEntry>, GameError> {
        let repo = self.read()?;
        if repo.lobby(lobby_id).is_none() {
            return Err(GameError::LobbyNotFound(*lobby_id));
        }
        let now = self.clock.now();
        let window = self.config.lobby_active_window;
        let mut roster: Vec<RosterEntry> = repo
            .players_in_lobby(lobby_id)
            .into_iter()
            .filter(|p| !p.banned)
            .map(|p| RosterEntry {
                id: p.id.clone(),
                team: p.team,
                lat: p.lat,
                lon: p.lon,
                is_active: is_fresh(p, now, window),
            })
            .collect();
        roster.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(roster)
    }
}
