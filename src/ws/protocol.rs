//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is one JSON object `{ "type": ..., "data"?: ..., "message"?: ... }`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{GameError, GameStateView};

/// Message type tag shared by both directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    StartGame,
    Move,
    GameState,
    GameOver,
    Error,
    Connected,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Move the game from Waiting to InProgress
    StartGame,

    /// Fire at the opponent's board
    Move { data: MoveData },
}

/// Shot coordinates. Kept signed so out-of-range values reach the rules
/// engine and get a proper error instead of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MoveData {
    pub x: i64,
    pub y: i64,
}

/// Messages sent from server to client
#[derive(Debug, Clone)]
pub enum ServerMsg {
    /// Personal acknowledgement after the connection is bound
    Connected { game_id: Uuid },

    /// Broadcast notice that the game has started
    GameStarted,

    /// Per-player game state
    GameState(Box<GameStateView>),

    /// Broadcast when the last ship of a player sinks
    GameOver { winner_id: Uuid, winner_name: String },

    /// Personal error reply
    Error { code: String, message: String },
}

impl ServerMsg {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            ServerMsg::Connected { .. } => MessageType::Connected,
            ServerMsg::GameStarted | ServerMsg::GameState(_) => MessageType::GameState,
            ServerMsg::GameOver { .. } => MessageType::GameOver,
            ServerMsg::Error { .. } => MessageType::Error,
        }
    }

    /// Wire frame for this message
    pub fn frame(&self) -> Frame<'_> {
        let (data, message) = match self {
            ServerMsg::Connected { game_id } => (None, Some(format!("Connected to game {}", game_id))),
            ServerMsg::GameStarted => (None, Some("Game started".to_string())),
            ServerMsg::GameState(view) => (Some(Payload::State(view)), None),
            ServerMsg::GameOver {
                winner_id,
                winner_name,
            } => (
                Some(Payload::GameOver {
                    winner_id: *winner_id,
                    winner_name,
                    message: format!("Player {} won!", winner_name),
                }),
                None,
            ),
            ServerMsg::Error { code, message } => (Some(Payload::Error { code }), Some(message.clone())),
        };

        Frame {
            kind: self.message_type(),
            data,
            message,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.frame())
    }
}

impl From<&GameError> for ServerMsg {
    fn from(err: &GameError) -> Self {
        ServerMsg::error(err.code(), err.to_string())
    }
}

/// Serialized envelope
#[derive(Debug, Serialize)]
pub struct Frame<'a> {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Payload<'a> {
    State(&'a GameStateView),
    GameOver {
        winner_id: Uuid,
        winner_name: &'a str,
        message: String,
    },
    Error {
        code: &'a str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn parses_start_game() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"start_game"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::StartGame));
    }

    #[test]
    fn parses_move_with_data() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"move","data":{"x":3,"y":7}}"#).unwrap();
        match msg {
            ClientMsg::Move { data } => assert_eq!(data, MoveData { x: 3, y: 7 }),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn move_without_data_is_rejected() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"move"}"#).is_err());
    }

    #[test]
    fn server_only_types_are_rejected_from_clients() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"game_over"}"#).is_err());
    }

    #[test]
    fn error_frame_shape() {
        let msg = ServerMsg::from(&GameError::NotYourTurn);
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "error", "message": "Not your turn", "data": {"code": "turn_violation"}})
        );
    }

    #[test]
    fn game_started_is_a_game_state_notice() {
        let value: Value = serde_json::from_str(&ServerMsg::GameStarted.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "game_state", "message": "Game started"}));
    }

    #[test]
    fn game_over_carries_winner() {
        let winner_id = Uuid::new_v4();
        let msg = ServerMsg::GameOver {
            winner_id,
            winner_name: "ahab".to_string(),
        };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "game_over");
        assert_eq!(value["data"]["winner_id"], winner_id.to_string());
        assert_eq!(value["data"]["message"], "Player ahab won!");
    }
}
