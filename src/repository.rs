use crate::error::GameError;
use crate::lobby::{CaptureRecord, Lobby, LobbyId, Objective, ObjectiveId, Player, PlayerId};
use std::collections::{BTreeMap, HashMap};

/// Storage collaborator holding every entity the engine works on.
///
/// Implementations enforce the uniqueness constraints (lobby id, join code,
/// player id); the engine relies on them instead of its own existence checks.
pub trait Repository: Send + Sync + 'static {
    fn insert_lobby(&mut self, lobby: Lobby) -> Result<(), GameError>;
    fn lobby(&self, id: &LobbyId) -> Option<&Lobby>;
    fn lobby_mut(&mut self, id: &LobbyId) -> Option<&mut Lobby>;
    fn lobby_by_code(&self, code: &str) -> Option<&Lobby>;
    /// Lobbies in creation order.
    fn lobbies(&self) -> Vec<&Lobby>;
    fn remove_lobby(&mut self, id: &LobbyId) -> Option<Lobby>;

    fn insert_player(&mut self, player: Player) -> Result<(), GameError>;
    fn player(&self, id: &str) -> Option<&Player>;
    fn player_mut(&mut self, id: &str) -> Option<&mut Player>;
    fn players(&self) -> Vec<&Player>;
    fn players_in_lobby(&self, lobby: &LobbyId) -> Vec<&Player>;

    fn next_objective_id(&mut self) -> ObjectiveId;
    fn insert_objective(&mut self, objective: Objective) -> Result<(), GameError>;
    fn objective(&self, id: ObjectiveId) -> Option<&Objective>;
    fn objective_mut(&mut self, id: ObjectiveId) -> Option<&mut Objective>;
    /// Objectives scoped to `lobby`, or the global ones for `None`.
    fn objectives_in_scope(&self, lobby: Option<&LobbyId>) -> Vec<&Objective>;
    fn remove_objectives_in_lobby(&mut self, lobby: &LobbyId) -> usize;

    fn append_capture(&mut self, record: CaptureRecord);
    fn captures(&self) -> &[CaptureRecord];
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    lobbies: HashMap<LobbyId, Lobby>,
    lobby_order: Vec<LobbyId>,
    join_codes: HashMap<String, LobbyId>,
    players: HashMap<PlayerId, Player>,
    objectives: BTreeMap<ObjectiveId, Objective>,
    last_objective_id: ObjectiveId,
    captures: Vec<CaptureRecord>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Repository for MemoryRepository {
    fn insert_lobby(&mut self, lobby: Lobby) -> Result<(), GameError> {
        if self.lobbies.contains_key(&lobby.id) {
            return Err(GameError::Duplicate(format!("lobby {}", lobby.id)));
        }
        if let Some(code) = &lobby.join_code {
            if self.join_codes.contains_key(code) {
                return Err(GameError::DuplicateJoinCode(code.clone()));
            }
            self.join_codes.insert(code.clone(), lobby.id);
        }
        self.lobby_order.push(lobby.id);
        self.lobbies.insert(lobby.id, lobby);
        Ok(())
    }

    fn lobby(&self, id: &LobbyId) -> Option<&Lobby> {
        self.lobbies.get(id)
    }

    fn lobby_mut(&mut self, id: &LobbyId) -> Option<&mut Lobby> {
        self.lobbies.get_mut(id)
    }

    fn lobby_by_code(&self, code: &str) -> Option<&Lobby> {
        self.join_codes
            .get(code)
            .and_then(|id| self.lobbies.get(id))
    }

    fn lobbies(&self) -> Vec<&Lobby> {
        self.lobby_order
            .iter()
            .filter_map(|id| self.lobbies.get(id))
            .collect()
    }

    fn remove_lobby(&mut self, id: &LobbyId) -> Option<Lobby> {
        let lobby = self.lobbies.remove(id)?;
        self.lobby_order.retain(|other| other != id);
        if let Some(code) = &lobby.join_code {
            self.join_codes.remove(code);
        }
        Some(lobby)
    }

    fn insert_player(&mut self, player: Player) -> Result<(), GameError> {
        if self.players.contains_key(&player.id) {
            return Err(GameError::Duplicate(format!("player {}", player.id)));
        }
        self.players.insert(player.id.clone(), player);
        Ok(())
    }

    fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    fn players(&self) -> Vec<&Player> {
        self.players.values().collect()
    }

    fn players_in_lobby(&self, lobby: &LobbyId) -> Vec<&Player> {
        self.players
            .values()
            .filter(|p| p.lobby_id.as_ref() == Some(lobby))
            .collect()
    }

    fn next_objective_id(&mut self) -> ObjectiveId {
        self.last_objective_id += 1;
        self.last_objective_id
    }

    fn insert_objective(&mut self, objective: Objective) -> Result<(), GameError> {
        if self.objectives.contains_key(&objective.id) {
            return Err(GameError::Duplicate(format!("objective {}", objective.id)));
        }
        self.objectives.insert(objective.id, objective);
        Ok(())
    }

    fn objective(&self, id: ObjectiveId) -> Option<&Objective> {
        self.objectives.get(&id)
    }

    fn objective_mut(&mut self, id: ObjectiveId) -> Option<&mut Objective> {
        self.objectives.get_mut(&id)
    }

    fn objectives_in_scope(&self, lobby: Option<&LobbyId>) -> Vec<&Objective> {
        self.objectives
            .values()
            .filter(|o| o.lobby_id.as_ref() == lobby)
            .collect()
    }

    fn remove_objectives_in_lobby(&mut self, lobby: &LobbyId) -> usize {
        let before = self.objectives.len();
        self.objectives
            .retain(|_, o| o.lobby_id.as_ref() != Some(lobby));
        before - self.objectives.len()
    }

    fn append_capture(&mut self, record: CaptureRecord) {
        self.captures.push(record);
    }

    fn captures(&self) -> &[CaptureRecord] {
        &self.captures
    }
}
