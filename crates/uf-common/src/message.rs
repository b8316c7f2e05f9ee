use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Liveness heartbeat. `subscribed = true` together with a `request_id`
/// matching a pending recovery confirms that recovery's completion;
/// `subscribed = false` is a plain heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AliveMessage {
    pub producer_id: u16,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub subscribed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

/// Marks the end of a replayed snapshot for one recovery request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotCompleteMessage {
    pub producer_id: u16,
    pub request_id: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Event-scoped feed payload (odds change, bet stop, fixture change).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventMessage {
    pub producer_id: u16,
    pub event_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

/// A decoded feed message. JSON on the wire, internally tagged on `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Alive(AliveMessage),
    SnapshotComplete(SnapshotCompleteMessage),
    OddsChange(EventMessage),
    BetStop(EventMessage),
    FixtureChange(EventMessage),
}

impl FeedMessage {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn producer_id(&self) -> u16 {
        match self {
            FeedMessage::Alive(m) => m.producer_id,
            FeedMessage::SnapshotComplete(m) => m.producer_id,
            FeedMessage::OddsChange(m) | FeedMessage::BetStop(m) | FeedMessage::FixtureChange(m) => {
                m.producer_id
            }
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            FeedMessage::Alive(m) => m.timestamp,
            FeedMessage::SnapshotComplete(m) => m.timestamp,
            FeedMessage::OddsChange(m) | FeedMessage::BetStop(m) | FeedMessage::FixtureChange(m) => {
                m.timestamp
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        matches!(self, FeedMessage::Alive(_))
    }
}
