use crate::app::time::Clock;
use crate::game::engine::{EngineEvent, GameEngine, Recipient};
use crate::game::round::RoundPhase;
use crate::game::types::ScoreboardEntry;
use crate::protocol::{self, ClientMessage, ServerMessage};
use crate::shared::colors::random_color;
use crate::shared::names::{sanitize_player_name, DEFAULT_PLAYER_NAME};
use crate::store::worker::StoreHandle;
use crate::store::{PlayerRecord, PlayerStore};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// The single shared arena. Every connected session and the engine live
/// behind one lock, so a tick and an inbound message never interleave.
pub struct Arena {
    state: Mutex<ArenaState>,
    store: PlayerStore,
    clock: Arc<dyn Clock>,
    running: AtomicBool,
}

#[derive(Debug)]
struct SessionEntry {
    sender: UnboundedSender<String>,
}

#[derive(Debug)]
struct ArenaState {
    sessions: HashMap<String, SessionEntry>,
    engine: GameEngine,
    persist: StoreHandle,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArenaStats {
    pub sessions: usize,
    pub players: usize,
    pub phase: RoundPhase,
}

impl Arena {
    pub fn new(
        engine: GameEngine,
        store: PlayerStore,
        persist: StoreHandle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state: Mutex::new(ArenaState {
                sessions: HashMap::new(),
                engine,
                persist,
            }),
            store,
            clock,
            running: AtomicBool::new(false),
        }
    }

    pub async fn add_session(&self, sender: UnboundedSender<String>) -> String {
        let session_id = Uuid::new_v4().to_string();
        let mut state = self.state.lock().await;
        state
            .sessions
            .insert(session_id.clone(), SessionEntry { sender });
        tracing::debug!(session_id = %session_id, "session connected");
        session_id
    }

    pub async fn remove_session(&self, session_id: &str) {
        let mut state = self.state.lock().await;
        state.disconnect_session(session_id);
        state.flush_logged();
    }

    pub async fn handle_text_message(&self, session_id: &str, text: &str) {
        let Some(message) = protocol::decode_client_message(text) else {
            tracing::debug!(session_id, "ignoring unreadable client message");
            return;
        };
        match message {
            ClientMessage::Join { uuid, name } => {
                self.handle_join(session_id, uuid, name).await;
            }
            ClientMessage::ChangeDirection(direction) => {
                let mut state = self.state.lock().await;
                state.engine.change_direction(session_id, direction);
            }
            ClientMessage::UpdateName(name) => {
                let mut state = self.state.lock().await;
                state.engine.rename_player(session_id, &name);
                state.flush_logged();
            }
            ClientMessage::UpdateColor => {
                let mut state = self.state.lock().await;
                state.engine.recolor_player(session_id);
                state.flush_logged();
            }
            ClientMessage::ChatMessage(text) => {
                let now = self.clock.now_millis();
                let mut state = self.state.lock().await;
                state.engine.relay_chat(session_id, &text, now);
                state.flush_logged();
            }
        }
    }

    /// Binds the session to a durable identity. A live trail for the same
    /// identity is rebound without touching the store; otherwise the record
    /// is loaded (or created) with the lock released.
    async fn handle_join(&self, session_id: &str, uuid: Option<String>, name: Option<String>) {
        let uuid = uuid
            .as_deref()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .unwrap_or_else(Uuid::new_v4)
            .to_string();

        {
            let mut state = self.state.lock().await;
            if !state.sessions.contains_key(session_id) {
                return;
            }
            if state.engine.rebind_player(session_id, &uuid).is_some() {
                state.flush_logged();
                return;
            }
        }

        let raw_name = name.unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string());
        let name = sanitize_player_name(&raw_name, DEFAULT_PLAYER_NAME);
        let color = random_color(&mut rand::thread_rng());
        let record = match self.store.load_or_create(&uuid, &name, &color).await {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(?error, uuid = %uuid, "player lookup failed, joining without persistence");
                PlayerRecord::detached(&uuid, &name, &color)
            }
        };

        let mut state = self.state.lock().await;
        if !state.sessions.contains_key(session_id) {
            tracing::debug!(session_id, uuid = %uuid, "session closed before join completed");
            return;
        }
        state.engine.add_or_rebind_player(session_id, &record);
        state.flush_logged();
    }

    pub async fn tick(&self) -> anyhow::Result<()> {
        let now = self.clock.now_millis();
        let mut state = self.state.lock().await;
        state.engine.tick(now);
        state.flush()
    }

    pub async fn broadcast_scoreboard(&self, entries: Vec<ScoreboardEntry>) {
        let mut state = self.state.lock().await;
        match state.deliver(&Recipient::All, &ServerMessage::UpdateScoreboard(entries)) {
            Ok(stale) => state.prune(stale),
            Err(error) => tracing::warn!(?error, "failed to push scoreboard"),
        }
        state.flush_logged();
    }

    pub async fn stats(&self) -> ArenaStats {
        let state = self.state.lock().await;
        ArenaStats {
            sessions: state.sessions.len(),
            players: state.engine.player_count(),
            phase: state.engine.phase(),
        }
    }

    /// Starts the tick loop once. Each tick is followed by a full period of
    /// sleep, so slow ticks push later ticks back instead of bunching up.
    pub fn spawn_tick_loop(self: &Arc<Self>, period: Duration) -> Option<JoinHandle<()>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }

        let arena = Arc::clone(self);
        Some(tokio::spawn(async move {
            loop {
                if let Err(error) = arena.tick().await {
                    tracing::error!(?error, "tick failed");
                }
                tokio::time::sleep(period).await;
            }
        }))
    }

    pub fn spawn_scoreboard_relay(
        self: &Arc<Self>,
        mut receiver: UnboundedReceiver<Vec<ScoreboardEntry>>,
    ) -> JoinHandle<()> {
        let arena = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(entries) = receiver.recv().await {
                arena.broadcast_scoreboard(entries).await;
            }
        })
    }
}

impl ArenaState {
    fn disconnect_session(&mut self, session_id: &str) {
        if self.sessions.remove(session_id).is_none() {
            return;
        }
        self.engine.remove_player(session_id);
        tracing::debug!(session_id, "session disconnected");
    }

    fn prune(&mut self, stale: Vec<String>) {
        for session_id in stale {
            tracing::warn!(session_id = %session_id, "dropping stale session");
            self.disconnect_session(&session_id);
        }
    }

    /// Encodes once and hands the frame to every addressed session. Returns
    /// the sessions whose channel has closed.
    fn deliver(&self, to: &Recipient, message: &ServerMessage) -> anyhow::Result<Vec<String>> {
        let payload = protocol::encode_server_message(message)?;
        let mut stale = Vec::new();
        match to {
            Recipient::All => {
                for (session_id, entry) in &self.sessions {
                    if entry.sender.send(payload.clone()).is_err() {
                        stale.push(session_id.clone());
                    }
                }
            }
            Recipient::Session(session_id) => {
                if let Some(entry) = self.sessions.get(session_id) {
                    if entry.sender.send(payload).is_err() {
                        stale.push(session_id.clone());
                    }
                }
            }
        }
        Ok(stale)
    }

    /// Drains engine events until none are left. Dropping a stale session can
    /// queue more events (a pause, for example), hence the loop.
    fn flush(&mut self) -> anyhow::Result<()> {
        let mut failed = 0usize;
        loop {
            let events = self.engine.drain_events();
            if events.is_empty() {
                break;
            }
            let mut stale = Vec::new();
            for event in events {
                match event {
                    EngineEvent::Persist(command) => self.persist.submit(command),
                    EngineEvent::Send { to, message } => match self.deliver(&to, &message) {
                        Ok(closed) => stale.extend(closed),
                        Err(error) => {
                            failed += 1;
                            tracing::warn!(?error, kind = message.kind(), "dropping server message");
                        }
                    },
                }
            }
            stale.sort();
            stale.dedup();
            self.prune(stale);
        }
        if failed > 0 {
            anyhow::bail!("{failed} server messages could not be encoded");
        }
        Ok(())
    }

    fn flush_logged(&mut self) {
        if let Err(error) = self.flush() {
            tracing::warn!(?error, "event flush incomplete");
        }
    }
}
