//! Socket event types and parser.
//!
//! Every frame is a JSON text message shaped `{"type": "<event>", "data": {...}}`
//! with camelCase fields. Outbound events are [`ClientEvent`]s, inbound ones
//! [`ServerEvent`]s. Socket.IO packets (`42["event", {...}]`) are not
//! understood and parse as [`MessageError::Malformed`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Events this client emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Join the room shared with the partner. Sent after every (re)connect.
    Join(JoinData),

    /// The local user started typing a task title or comment.
    Typing(TypingData),

    /// The local user stopped typing.
    StopTyping(TypingData),

    /// Snapshot of the local work timer, relayed to the partner.
    TimerUpdate(TimerUpdateData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinData {
    pub user_id: String,
    pub partner_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingData {
    pub recipient_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerUpdateData {
    pub partner_id: String,
    pub total_seconds: u64,
    pub is_running: bool,
    /// Sender clock in epoch milliseconds; lets the receiver drop
    /// snapshots that arrive out of order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<i64>,
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Events the socket server pushes to this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    UserOnline(PresenceData),
    UserOffline(PresenceData),
    PartnerTyping(TypingNotice),
    PartnerStopTyping(TypingNotice),
    PartnerTimerUpdate(TimerSnapshot),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceData {
    pub user_id: String,
}

/// Typing notices may or may not name the sender.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingNotice {
    #[serde(default)]
    pub sender_id: Option<String>,
}

/// The partner's timer as relayed by the server. There is no sequence
/// number on the wire; `sent_at` is present only when the peer sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub total_seconds: u64,
    pub is_running: bool,
    #[serde(default)]
    pub sent_at: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown event type '{0}'")]
    UnknownType(String),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Parse an inbound text frame.
///
/// Returns `Err` for malformed JSON or unknown `type` values. Callers
/// should log and continue.
pub fn parse_message(text: &str) -> Result<ServerEvent, MessageError> {
    let raw: RawFrame = serde_json::from_str(text)?;
    let data = match raw.data {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other,
    };

    let event = match raw.kind.as_str() {
        "user_online" => ServerEvent::UserOnline(serde_json::from_value(data)?),
        "user_offline" => ServerEvent::UserOffline(serde_json::from_value(data)?),
        "partner_typing" => ServerEvent::PartnerTyping(serde_json::from_value(data)?),
        "partner_stop_typing" => ServerEvent::PartnerStopTyping(serde_json::from_value(data)?),
        "partner_timer_update" => ServerEvent::PartnerTimerUpdate(serde_json::from_value(data)?),
        _ => return Err(MessageError::UnknownType(raw.kind)),
    };
    Ok(event)
}

/// Encode an outbound event as a text frame.
pub fn encode(event: &ClientEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}
