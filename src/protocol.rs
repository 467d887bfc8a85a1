use crate::game::types::{Direction, GameStateSnapshot, PlayerState, ScoreboardEntry};
use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    #[serde(alias = "joinGame")]
    Join {
        uuid: Option<String>,
        name: Option<String>,
    },
    ChangeDirection(Direction),
    UpdateName(String),
    UpdateColor,
    ChatMessage(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    GameState(GameStateSnapshot),
    PlayerJoined(PlayerState),
    PlayerUpdated(PlayerState),
    PlayerDied(PlayerState),
    GameStart,
    GamePaused(String),
    GameEnd(GameEndPayload),
    GameRestart,
    UpdateScoreboard(Vec<ScoreboardEntry>),
    ChatMessage(ChatPayload),
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GameEndPayload {
    Winner {
        winner: PlayerState,
    },
    NoSurvivors {
        #[serde(rename = "noSurvivors")]
        no_survivors: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatPayload {
    pub name: String,
    pub message: String,
    pub timestamp: i64,
}

pub fn decode_client_message(text: &str) -> Option<ClientMessage> {
    serde_json::from_str::<ClientMessage>(text).ok()
}

pub fn encode_server_message(message: &ServerMessage) -> anyhow::Result<String> {
    serde_json::to_string(message).context("failed to encode server message")
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::GameState(_) => "gameState",
            ServerMessage::PlayerJoined(_) => "playerJoined",
            ServerMessage::PlayerUpdated(_) => "playerUpdated",
            ServerMessage::PlayerDied(_) => "playerDied",
            ServerMessage::GameStart => "gameStart",
            ServerMessage::GamePaused(_) => "gamePaused",
            ServerMessage::GameEnd(_) => "gameEnd",
            ServerMessage::GameRestart => "gameRestart",
            ServerMessage::UpdateScoreboard(_) => "updateScoreboard",
            ServerMessage::ChatMessage(_) => "chatMessage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::Cell;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn player() -> PlayerState {
        PlayerState {
            id: "s1".to_string(),
            uuid: "u1".to_string(),
            name: "Ada".to_string(),
            body: vec![Cell::new(2, 1), Cell::new(1, 1)],
            color: "#00ff00".to_string(),
            alive: true,
            max_length_ever_reached: 2,
        }
    }

    #[test]
    fn decode_join_accepts_both_event_names() {
        let join = decode_client_message(r#"{"type":"join","data":{"uuid":"abc","name":"Ada"}}"#);
        let legacy =
            decode_client_message(r#"{"type":"joinGame","data":{"uuid":"abc","name":"Ada"}}"#);
        let expected = ClientMessage::Join {
            uuid: Some("abc".to_string()),
            name: Some("Ada".to_string()),
        };
        assert_eq!(join, Some(expected.clone()));
        assert_eq!(legacy, Some(expected));
    }

    #[test]
    fn decode_direction_and_unit_messages() {
        assert_eq!(
            decode_client_message(r#"{"type":"changeDirection","data":"left"}"#),
            Some(ClientMessage::ChangeDirection(Direction::Left))
        );
        assert_eq!(
            decode_client_message(r#"{"type":"updateColor"}"#),
            Some(ClientMessage::UpdateColor)
        );
        assert_eq!(
            decode_client_message(r#"{"type":"updateName","data":"Bob"}"#),
            Some(ClientMessage::UpdateName("Bob".to_string()))
        );
    }

    #[test]
    fn decode_rejects_unknown_directions_and_garbage() {
        assert_eq!(
            decode_client_message(r#"{"type":"changeDirection","data":"sideways"}"#),
            None
        );
        assert_eq!(decode_client_message(r#"{"type":"teleport"}"#), None);
        assert_eq!(decode_client_message("not json"), None);
    }

    #[test]
    fn game_end_payload_shapes() {
        let winner = encode_server_message(&ServerMessage::GameEnd(GameEndPayload::Winner {
            winner: player(),
        }))
        .expect("encode");
        let value: Value = serde_json::from_str(&winner).expect("json");
        assert_eq!(value["type"], "gameEnd");
        assert_eq!(value["data"]["winner"]["name"], "Ada");
        assert_eq!(value["data"]["winner"]["maxLengthEverReached"], 2);

        let none = encode_server_message(&ServerMessage::GameEnd(GameEndPayload::NoSurvivors {
            no_survivors: true,
        }))
        .expect("encode");
        let value: Value = serde_json::from_str(&none).expect("json");
        assert_eq!(value, json!({"type": "gameEnd", "data": {"noSurvivors": true}}));
    }

    #[test]
    fn game_state_is_keyed_by_session() {
        let mut players = HashMap::new();
        players.insert("s1".to_string(), player());
        let snapshot = GameStateSnapshot {
            players,
            food: Cell::new(4, 4),
        };
        let text = encode_server_message(&ServerMessage::GameState(snapshot)).expect("encode");
        let value: Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["data"]["food"], json!({"x": 4, "y": 4}));
        assert_eq!(value["data"]["players"]["s1"]["body"][0], json!({"x": 2, "y": 1}));
        assert_eq!(
            encode_server_message(&ServerMessage::GameStart).expect("encode"),
            r#"{"type":"gameStart"}"#
        );
    }
}
