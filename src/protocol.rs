//! Control protocol (C7): client commands in, server messages out.
//! Unknown actions decode to `ClientMessage::Unknown`; malformed JSON is
//! surfaced as a `parse` error by the caller, never a panic.

use serde::{Deserialize, Serialize};

use crate::errors::ErrorKind;
use crate::race::RaceSnapshot;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Start,
    Stop,
    Speed { value: u32 },
    Ping,
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parses a single text frame. Never panics: malformed JSON is an
    /// explicit error the caller reports as `ErrorKind::Parse`.
    pub fn parse(raw: &str) -> Result<Self, ErrorKind> {
        serde_json::from_str(raw).map_err(|_| ErrorKind::Parse)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Sync {
        track_length: f64,
        physics_hz: u32,
        broadcast_hz: u32,
        current_tick: u64,
        snapshot: Option<RaceSnapshot>,
    },
    Error {
        message: String,
        kind: ErrorKind,
    },
    Pong {
        timestamp: u64,
    },
}

impl ServerMessage {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("server messages are always serializable")
    }
}

/// A `RaceSnapshot` itself has no `type` tag (spec section 4.7); it is sent
/// as a bare JSON document distinguished by the presence of a `tick` field.
pub fn snapshot_to_json(snapshot: &RaceSnapshot) -> String {
    serde_json::to_string(snapshot).expect("snapshots are always serializable")
}
