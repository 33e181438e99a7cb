//! Realtime wire types

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// `teamBoard:update` with `{task}`, `{deletedTaskId}` or `{id, data, title}`
pub const TEAM_BOARD_UPDATE: &str = "teamBoard:update";

/// `board:shared` with `{boardId, title}`, sent to the new member
pub const BOARD_SHARED: &str = "board:shared";

/// `msg:new` with the stored message, sent to the recipient
pub const MESSAGE_NEW: &str = "msg:new";

/// `team:created` with the full team, sent to every socket
pub const TEAM_CREATED: &str = "team:created";

/// `team:updated` with the full team, sent to every socket
pub const TEAM_UPDATED: &str = "team:updated";

/// Client activity relayed verbatim to every socket
pub const ACTIVITY_NEW: &str = "activity:new";

/// A named subscription channel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    /// Personal room of a user: `user:<id>`
    User(String),

    /// Room of a team's board: `teamBoard:<id>`
    TeamBoard(String),
}

impl Room {
    pub fn user(id: impl Into<String>) -> Self {
        Room::User(id.into())
    }

    pub fn team_board(id: impl Into<String>) -> Self {
        Room::TeamBoard(id.into())
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::User(id) => write!(f, "user:{}", id),
            Room::TeamBoard(id) => write!(f, "teamBoard:{}", id),
        }
    }
}

/// Frame pushed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFrame {
    pub event: String,
    pub data: JsonValue,
}

impl ServerFrame {
    pub fn new(event: &str, data: JsonValue) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }
}

/// Frame received from a client, before interpretation
#[derive(Debug, Deserialize)]
struct ClientFrame {
    event: String,
    #[serde(default)]
    data: JsonValue,
}

/// What a client asked for
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Join `user:<id>`
    Register(String),

    /// Join `teamBoard:<id>`
    JoinTeamBoard(String),

    /// Relay to everyone
    Activity(JsonValue),

    /// Anything else; ignored
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("{event} requires an id")]
    MissingId { event: &'static str },
}

/// Room ids may arrive as JSON strings or numbers
fn id_from(data: &JsonValue, event: &'static str) -> Result<String, FrameError> {
    match data {
        JsonValue::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        JsonValue::Number(n) => Ok(n.to_string()),
        _ => Err(FrameError::MissingId { event }),
    }
}

impl ClientEvent {
    /// Parses a text frame
    pub fn parse(raw: &str) -> Result<Self, FrameError> {
        let frame: ClientFrame =
            serde_json::from_str(raw).map_err(|e| FrameError::Malformed(e.to_string()))?;

        Ok(match frame.event.as_str() {
            "register" => ClientEvent::Register(id_from(&frame.data, "register")?),
            "joinTeamBoard" => ClientEvent::JoinTeamBoard(id_from(&frame.data, "joinTeamBoard")?),
            ACTIVITY_NEW => ClientEvent::Activity(frame.data),
            _ => ClientEvent::Unknown(frame.event),
        })
    }
}
