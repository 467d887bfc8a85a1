use super::constants::{
    GRID_HEIGHT, GRID_WIDTH, MAX_CHAT_MESSAGE_LENGTH, PAUSED_NEED_PLAYERS, RESTART_DELAY_MS,
    START_GRACE_MS,
};
use super::food::Food;
use super::grid::Grid;
use super::round::{evaluate_round_end, Round, RoundEnd, RoundPhase, ScheduledKind};
use super::trail::Trail;
use super::types::{Cell, Direction, GameStateSnapshot, PlayerState};
use crate::protocol::{ChatPayload, GameEndPayload, ServerMessage};
use crate::shared::colors::{is_hex_color, random_color};
use crate::shared::names::{sanitize_chat_message, sanitize_player_name, DEFAULT_PLAYER_NAME};
use crate::store::worker::StoreCommand;
use crate::store::PlayerRecord;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub grid_width: i32,
    pub grid_height: i32,
    pub restart_delay_ms: i64,
    pub start_grace_ms: i64,
    pub self_collision: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            grid_width: GRID_WIDTH,
            grid_height: GRID_HEIGHT,
            restart_delay_ms: RESTART_DELAY_MS,
            start_grace_ms: START_GRACE_MS,
            self_collision: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    All,
    Session(String),
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    Send {
        to: Recipient,
        message: ServerMessage,
    },
    Persist(StoreCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    Created(PlayerState),
    Rebound(PlayerState),
}

/// Owns every piece of mutable game state. All methods are synchronous;
/// side effects for the outside world are queued as [`EngineEvent`]s and
/// collected with [`GameEngine::drain_events`].
#[derive(Debug)]
pub struct GameEngine {
    settings: EngineSettings,
    grid: Grid,
    food: Food,
    round: Round,
    trails: HashMap<String, Trail>,
    sessions_by_uuid: HashMap<String, String>,
    rng: StdRng,
    events: Vec<EngineEvent>,
}

impl GameEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    pub fn with_rng(settings: EngineSettings, mut rng: StdRng) -> Self {
        let grid = Grid::new(settings.grid_width, settings.grid_height);
        let food = Food::spawn(&grid, &mut rng);
        Self {
            settings,
            grid,
            food,
            round: Round::new(),
            trails: HashMap::new(),
            sessions_by_uuid: HashMap::new(),
            rng,
            events: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[cfg(test)]
    pub fn food(&self) -> &Food {
        &self.food
    }

    pub fn phase(&self) -> RoundPhase {
        self.round.phase()
    }

    #[cfg(test)]
    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn player_count(&self) -> usize {
        self.trails.len()
    }

    #[cfg(test)]
    pub fn trail(&self, session_id: &str) -> Option<&Trail> {
        self.trails.get(session_id)
    }

    #[cfg(test)]
    pub fn session_for_uuid(&self, uuid: &str) -> Option<&str> {
        self.sessions_by_uuid.get(uuid).map(String::as_str)
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> GameStateSnapshot {
        GameStateSnapshot {
            players: self
                .trails
                .iter()
                .map(|(session_id, trail)| (session_id.clone(), trail.state()))
                .collect(),
            food: self.food.position,
        }
    }

    /// Moves a live trail owned by `uuid` onto `session_id`. Returns `None`
    /// when the identity has no trail in the arena.
    pub fn rebind_player(&mut self, session_id: &str, uuid: &str) -> Option<PlayerState> {
        let previous = self.sessions_by_uuid.get(uuid)?.clone();
        if previous != session_id {
            if self.trails.contains_key(session_id) {
                self.remove_player(session_id);
            }
            let mut trail = self.trails.remove(&previous)?;
            trail.session_id = session_id.to_string();
            self.trails.insert(session_id.to_string(), trail);
            self.sessions_by_uuid
                .insert(uuid.to_string(), session_id.to_string());
            tracing::info!(uuid, session_id, previous = %previous, "player rebound to new session");
        }
        let state = self.trails.get(session_id)?.state();
        let snapshot = self.snapshot();
        self.send_to(session_id, ServerMessage::GameState(snapshot));
        self.persist(StoreCommand::RefreshScoreboard);
        Some(state)
    }

    pub fn add_or_rebind_player(&mut self, session_id: &str, record: &PlayerRecord) -> JoinOutcome {
        if let Some(state) = self.rebind_player(session_id, &record.uuid) {
            return JoinOutcome::Rebound(state);
        }
        if self.trails.contains_key(session_id) {
            self.detach(session_id);
        }

        let color = if is_hex_color(&record.color) {
            record.color.clone()
        } else {
            random_color(&mut self.rng)
        };
        let trails = &self.trails;
        let trail = Trail::spawn(
            session_id.to_string(),
            record.uuid.clone(),
            record.name.clone(),
            color,
            record.max_length.max(0) as usize,
            &self.grid,
            &mut self.rng,
            |cell| trails.values().any(|trail| trail.body.contains(&cell)),
        );
        let state = trail.state();
        self.trails.insert(session_id.to_string(), trail);
        self.sessions_by_uuid
            .insert(record.uuid.clone(), session_id.to_string());
        tracing::info!(
            uuid = %record.uuid,
            session_id,
            name = %state.name,
            color = %state.color,
            "player joined"
        );

        self.broadcast(ServerMessage::PlayerJoined(state.clone()));
        self.persist(StoreCommand::RefreshScoreboard);
        self.try_start();
        JoinOutcome::Created(state)
    }

    pub fn remove_player(&mut self, session_id: &str) -> Option<PlayerState> {
        let state = self.detach(session_id)?;
        tracing::info!(uuid = %state.uuid, session_id, name = %state.name, "player left");
        if self.round.is_playing() && self.trails.len() < 2 {
            self.round.pause();
            tracing::info!(players = self.trails.len(), "round paused");
            self.broadcast(ServerMessage::GamePaused(PAUSED_NEED_PLAYERS.to_string()));
        }
        Some(state)
    }

    pub fn change_direction(&mut self, session_id: &str, direction: Direction) -> bool {
        let Some(trail) = self.trails.get_mut(session_id) else { return false };
        trail.set_heading(direction)
    }

    pub fn rename_player(&mut self, session_id: &str, name: &str) -> Option<PlayerState> {
        let trail = self.trails.get_mut(session_id)?;
        trail.name = sanitize_player_name(name, DEFAULT_PLAYER_NAME);
        let state = trail.state();
        self.broadcast(ServerMessage::PlayerUpdated(state.clone()));
        self.persist(StoreCommand::UpdateName {
            uuid: state.uuid.clone(),
            name: state.name.clone(),
        });
        Some(state)
    }

    pub fn recolor_player(&mut self, session_id: &str) -> Option<PlayerState> {
        let color = random_color(&mut self.rng);
        let trail = self.trails.get_mut(session_id)?;
        trail.color = color;
        let state = trail.state();
        self.broadcast(ServerMessage::PlayerUpdated(state.clone()));
        self.persist(StoreCommand::UpdateColor {
            uuid: state.uuid.clone(),
            color: state.color.clone(),
        });
        Some(state)
    }

    pub fn relay_chat(&mut self, session_id: &str, message: &str, now: i64) -> bool {
        let Some(trail) = self.trails.get(session_id) else { return false };
        let Some(message) = sanitize_chat_message(message, MAX_CHAT_MESSAGE_LENGTH) else {
            return false;
        };
        let payload = ChatPayload {
            name: trail.name.clone(),
            message,
            timestamp: now,
        };
        tracing::info!(uuid = %trail.uuid, name = %payload.name, message = %payload.message, "chat message");
        self.broadcast(ServerMessage::ChatMessage(payload));
        true
    }

    /// One simulation step. Due scheduled actions run first; the board only
    /// moves while playing; a snapshot goes out every time.
    pub fn tick(&mut self, now: i64) {
        self.run_due_action(now);
        if self.round.is_playing() {
            self.step(now);
        }
        let snapshot = self.snapshot();
        self.broadcast(ServerMessage::GameState(snapshot));
    }

    fn step(&mut self, now: i64) {
        let mut new_records = false;
        let mut record_commands = Vec::new();
        for trail in self.trails.values_mut() {
            if trail.advance(&self.grid) {
                new_records = true;
                record_commands.push(StoreCommand::UpdateMaxLength {
                    uuid: trail.uuid.clone(),
                    candidate: trail.max_length,
                });
            }
        }
        for command in record_commands {
            self.persist(command);
        }

        self.resolve_collisions();
        self.resolve_food();
        self.evaluate_round_end(now);

        if new_records {
            self.persist(StoreCommand::RefreshScoreboard);
        }
    }

    /// Every live head is tested against every body present at the start of
    /// the pass, dead ones included. Deaths are applied afterwards so the
    /// result does not depend on iteration order.
    fn resolve_collisions(&mut self) {
        let mut dead: Vec<String> = self
            .trails
            .iter()
            .filter(|(_, trail)| trail.alive)
            .filter(|(session_id, trail)| {
                self.trails.iter().any(|(other_id, other)| {
                    if other_id == *session_id {
                        self.settings.self_collision && trail.collides_with_self()
                    } else {
                        trail.collides_with(other)
                    }
                })
            })
            .map(|(session_id, _)| session_id.clone())
            .collect();
        dead.sort();

        for session_id in dead {
            let Some(trail) = self.trails.get_mut(&session_id) else { continue };
            trail.die();
            let state = trail.state();
            tracing::debug!(session_id = %session_id, uuid = %state.uuid, len = state.body.len(), "player died");
            self.broadcast(ServerMessage::PlayerDied(state));
        }
    }

    /// First live eater in session order takes the food. Two live heads can
    /// never share a cell after the collision pass, so at most one trail
    /// qualifies in practice.
    fn resolve_food(&mut self) {
        let mut session_ids: Vec<&String> = self.trails.keys().collect();
        session_ids.sort();
        let eater = session_ids
            .into_iter()
            .find(|session_id| {
                self.trails
                    .get(*session_id)
                    .is_some_and(|trail| trail.alive && trail.eats(&self.food))
            })
            .cloned();
        let Some(eater) = eater else { return };

        if let Some(trail) = self.trails.get_mut(&eater) {
            trail.grow();
        }
        let trails = &self.trails;
        self.food.respawn(&self.grid, &mut self.rng, |cell| {
            trails
                .values()
                .any(|trail| trail.alive && trail.body.contains(&cell))
        });
    }

    fn evaluate_round_end(&mut self, now: i64) {
        let mut alive: Vec<String> = self
            .trails
            .iter()
            .filter(|(_, trail)| trail.alive)
            .map(|(session_id, _)| session_id.clone())
            .collect();
        alive.sort();
        let Some(outcome) = evaluate_round_end(&alive, self.trails.len()) else { return };

        self.round.finish(now, self.settings.restart_delay_ms);
        let payload = match outcome {
            RoundEnd::Winner(session_id) => match self.trails.get(&session_id) {
                Some(winner) => {
                    tracing::info!(session_id = %session_id, name = %winner.name, "round won");
                    GameEndPayload::Winner {
                        winner: winner.state(),
                    }
                }
                None => GameEndPayload::NoSurvivors { no_survivors: true },
            },
            RoundEnd::NoSurvivors => {
                tracing::info!("round ended with no survivors");
                GameEndPayload::NoSurvivors { no_survivors: true }
            }
        };
        self.broadcast(ServerMessage::GameEnd(payload));
    }

    fn run_due_action(&mut self, now: i64) {
        match self.round.take_due(now) {
            Some(ScheduledKind::Restart) => self.restart(now),
            Some(ScheduledKind::Start) => {
                if self.trails.len() >= 2 {
                    self.try_start();
                } else {
                    self.broadcast(ServerMessage::GamePaused(PAUSED_NEED_PLAYERS.to_string()));
                }
            }
            None => {}
        }
    }

    fn restart(&mut self, now: i64) {
        self.round.restart();
        let mut session_ids: Vec<String> = self.trails.keys().cloned().collect();
        session_ids.sort();
        let mut placed: HashSet<Cell> = HashSet::new();
        for session_id in session_ids {
            let Some(trail) = self.trails.get_mut(&session_id) else { continue };
            trail.reset(&self.grid, &mut self.rng, |cell| placed.contains(&cell));
            placed.extend(trail.body.iter().copied());
        }
        let trails = &self.trails;
        self.food.respawn(&self.grid, &mut self.rng, |cell| {
            trails.values().any(|trail| trail.body.contains(&cell))
        });
        tracing::info!(players = self.trails.len(), "round restarted");
        self.broadcast(ServerMessage::GameRestart);
        let snapshot = self.snapshot();
        self.broadcast(ServerMessage::GameState(snapshot));

        if self.trails.len() < 2 {
            self.broadcast(ServerMessage::GamePaused(PAUSED_NEED_PLAYERS.to_string()));
        } else if self.settings.start_grace_ms <= 0 {
            self.try_start();
        } else {
            self.round.schedule_start(now, self.settings.start_grace_ms);
        }
    }

    fn try_start(&mut self) {
        if !self.round.can_start(self.trails.len()) {
            return;
        }
        self.round.start();
        tracing::info!(players = self.trails.len(), "round started");
        self.broadcast(ServerMessage::GameStart);
    }

    fn detach(&mut self, session_id: &str) -> Option<PlayerState> {
        let trail = self.trails.remove(session_id)?;
        if self.sessions_by_uuid.get(&trail.uuid).map(String::as_str) == Some(session_id) {
            self.sessions_by_uuid.remove(&trail.uuid);
        }
        Some(trail.state())
    }

    fn broadcast(&mut self, message: ServerMessage) {
        self.events.push(EngineEvent::Send {
            to: Recipient::All,
            message,
        });
    }

    fn send_to(&mut self, session_id: &str, message: ServerMessage) {
        self.events.push(EngineEvent::Send {
            to: Recipient::Session(session_id.to_string()),
            message,
        });
    }

    fn persist(&mut self, command: StoreCommand) {
        self.events.push(EngineEvent::Persist(command));
    }
}
