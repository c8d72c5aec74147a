use crate::errors::GatewayError;

/// Events yielded by a provider's streaming call. Ordering contract:
///
/// Start → TextDelta* → (Done | Error)
#[derive(Clone, Debug)]
pub enum StreamEvent {
    Start,
    TextDelta { delta: String },
    /// Terminal; carries the full accumulated text.
    Done { text: String },
    Error { error: GatewayError },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
