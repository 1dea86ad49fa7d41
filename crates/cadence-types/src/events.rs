//! Notification events produced by the oracle, the sentry and the daemon.
//!
//! Events travel as a JSON envelope. 256-bit quantities in payloads are
//! rendered as decimal strings.

use serde::{Deserialize, Serialize};

/// Envelope for all notification events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    /// Unix timestamp at which the event was produced.
    pub timestamp: u64,
    pub payload: serde_json::Value,
}

/// All event types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Oracle events
    Updated,

    // Sentry events
    AddSentryStrategy,
    RemoveSentryStrategy,
    UpdateSanctionsList,
    RoleGranted,
    RoleRevoked,

    // System events
    DaemonStarted,
    ErrorOccurred,
}

impl EventType {
    /// Category used by subscribers to filter the stream.
    pub fn category(&self) -> &'static str {
        match self {
            EventType::Updated => "oracle",
            EventType::AddSentryStrategy
            | EventType::RemoveSentryStrategy
            | EventType::UpdateSanctionsList
            | EventType::RoleGranted
            | EventType::RoleRevoked => "sentry",
            EventType::DaemonStarted | EventType::ErrorOccurred => "system",
        }
    }
}

impl Event {
    pub fn new(event_type: EventType, timestamp: u64, payload: serde_json::Value) -> Self {
        Self {
            event_type,
            timestamp,
            payload,
        }
    }
}
