use serde::{Deserialize, Serialize};

use crate::ids::MessageId;
use crate::participant::{Participant, ProviderKind};

/// Lifecycle and content events emitted by a debate run.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RoundStart,
    StreamStart,
    StreamChunk,
    StreamEnd,
    RoundEnd,
    DebateEnd,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundStart => "round_start",
            Self::StreamStart => "stream_start",
            Self::StreamChunk => "stream_chunk",
            Self::StreamEnd => "stream_end",
            Self::RoundEnd => "round_end",
            Self::DebateEnd => "debate_end",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a debate stopped producing rounds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Completed,
    UserStopped,
}

/// One record on the debate event stream. Field names are the wire format.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DebateEvent {
    #[serde(rename = "event_type")]
    pub kind: EventKind,
    pub provider: Option<ProviderKind>,
    #[serde(default)]
    pub content: String,
    pub message_id: Option<MessageId>,
    pub round_number: u32,
    pub max_rounds: Option<u32>,
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<EndReason>,
}

impl DebateEvent {
    fn bare(kind: EventKind, content: String, round: u32, max_rounds: Option<u32>) -> Self {
        Self {
            kind,
            provider: None,
            content,
            message_id: None,
            round_number: round,
            max_rounds,
            model_id: None,
            reason: None,
        }
    }

    fn message(
        kind: EventKind,
        participant: &Participant,
        message_id: &MessageId,
        content: String,
        round: u32,
        max_rounds: u32,
    ) -> Self {
        Self {
            kind,
            provider: Some(participant.provider),
            content,
            message_id: Some(message_id.clone()),
            round_number: round,
            max_rounds: Some(max_rounds),
            model_id: Some(participant.model_id.clone()),
            reason: None,
        }
    }

    pub fn round_start(round: u32, max_rounds: u32) -> Self {
        Self::bare(
            EventKind::RoundStart,
            format!("Round {}", round + 1),
            round,
            Some(max_rounds),
        )
    }

    pub fn round_end(round: u32, max_rounds: u32) -> Self {
        Self::bare(
            EventKind::RoundEnd,
            format!("Round {} complete", round + 1),
            round,
            Some(max_rounds),
        )
    }

    pub fn stream_start(
        participant: &Participant,
        message_id: &MessageId,
        round: u32,
        max_rounds: u32,
    ) -> Self {
        Self::message(
            EventKind::StreamStart,
            participant,
            message_id,
            String::new(),
            round,
            max_rounds,
        )
    }

    /// Carries one incremental fragment, never the cumulative text.
    pub fn stream_chunk(
        participant: &Participant,
        message_id: &MessageId,
        fragment: impl Into<String>,
        round: u32,
        max_rounds: u32,
    ) -> Self {
        Self::message(
            EventKind::StreamChunk,
            participant,
            message_id,
            fragment.into(),
            round,
            max_rounds,
        )
    }

    pub fn stream_end(
        participant: &Participant,
        message_id: &MessageId,
        full_text: impl Into<String>,
        round: u32,
        max_rounds: u32,
    ) -> Self {
        Self::message(
            EventKind::StreamEnd,
            participant,
            message_id,
            full_text.into(),
            round,
            max_rounds,
        )
    }

    pub fn debate_end(reason: EndReason, round: u32, max_rounds: u32) -> Self {
        let content = match reason {
            EndReason::Completed => "Debate completed",
            EndReason::UserStopped => "Debate stopped by user",
        };
        let mut event = Self::bare(EventKind::DebateEnd, content.into(), round, Some(max_rounds));
        event.reason = Some(reason);
        event
    }

    pub fn error(content: impl Into<String>, round: u32, provider: Option<ProviderKind>) -> Self {
        let mut event = Self::bare(EventKind::Error, content.into(), round, None);
        event.provider = provider;
        event
    }

    /// `debate_end` or `error`: nothing follows these.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::DebateEnd | EventKind::Error)
    }
}
