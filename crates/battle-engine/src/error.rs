use battle_core::errors::GatewayError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session already streaming: {0}")]
    AlreadyStreaming(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("event receiver closed")]
    ReceiverClosed,
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::SessionNotFound(_) => "session_not_found",
            Self::AlreadyStreaming(_) => "already_streaming",
            Self::Gateway(e) => e.error_kind(),
            Self::ReceiverClosed => "receiver_closed",
        }
    }
}
