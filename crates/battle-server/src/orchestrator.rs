//! Debate orchestrator: connects the engine to the HTTP layer.
//!
//! `DebateOrchestrator` is the interface the routes call. `EngineOrchestrator`
//! is the production implementation backed by the session registry and the
//! debate runner.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use battle_core::events::DebateEvent;
use battle_core::ids::SessionId;
use battle_core::participant::{participants_or_default, Participant};
use battle_core::security::ApiKeys;
use battle_engine::error::EngineError;
use battle_engine::runner::DebateRunner;
use battle_engine::sessions::SessionRegistry;
use battle_llm::models::{available_models, AvailableModels};

/// Body of a start request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartDebate {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub max_rounds: Option<i64>,
    #[serde(default)]
    pub models: Option<Vec<Participant>>,
}

/// Accepted debate, echoed back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct DebateStarted {
    pub session_id: SessionId,
    pub question: String,
    pub max_rounds: u32,
    pub models: Vec<Participant>,
}

#[derive(Debug, Clone, Copy)]
pub struct DebateLimits {
    pub default_max_rounds: u32,
    pub max_rounds_limit: u32,
}

impl Default for DebateLimits {
    fn default() -> Self {
        Self {
            default_max_rounds: 2,
            max_rounds_limit: 20,
        }
    }
}

/// Absent or zero picks the default; anything else must be within the limit.
pub fn resolve_max_rounds(requested: Option<i64>, limits: DebateLimits) -> Result<u32, EngineError> {
    match requested {
        None | Some(0) => Ok(limits.default_max_rounds),
        Some(n) if n >= 1 && n <= i64::from(limits.max_rounds_limit) => Ok(n as u32),
        Some(n) => Err(EngineError::Validation(format!(
            "max_rounds must be between 1 and {}, got {n}",
            limits.max_rounds_limit
        ))),
    }
}

#[async_trait]
pub trait DebateOrchestrator: Send + Sync {
    async fn start(&self, request: StartDebate) -> Result<DebateStarted, EngineError>;
    /// Run the session's debate and stream its events. One stream per session.
    fn stream(&self, session_id: &SessionId) -> Result<ReceiverStream<DebateEvent>, EngineError>;
    fn stop(&self, session_id: &SessionId) -> Result<(), EngineError>;
    fn models(&self) -> AvailableModels;
}

/// Production orchestrator backed by the engine crates.
pub struct EngineOrchestrator {
    registry: Arc<SessionRegistry>,
    runner: DebateRunner,
    keys: ApiKeys,
    limits: DebateLimits,
}

impl EngineOrchestrator {
    pub fn new(
        registry: Arc<SessionRegistry>,
        runner: DebateRunner,
        keys: ApiKeys,
        limits: DebateLimits,
    ) -> Self {
        Self {
            registry,
            runner,
            keys,
            limits,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }
}

#[async_trait]
impl DebateOrchestrator for EngineOrchestrator {
    async fn start(&self, request: StartDebate) -> Result<DebateStarted, EngineError> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(EngineError::Validation("question must not be empty".into()));
        }
        let max_rounds = resolve_max_rounds(request.max_rounds, self.limits)?;
        let models = participants_or_default(request.models);
        let requested_id = request
            .session_id
            .filter(|id| !id.trim().is_empty())
            .map(SessionId::from_raw);

        let session_id = self
            .registry
            .create(requested_id, question.to_string(), max_rounds, models.clone());
        info!(session_id = %session_id, max_rounds, participants = models.len(), "debate session created");

        Ok(DebateStarted {
            session_id,
            question: question.to_string(),
            max_rounds,
            models,
        })
    }

    fn stream(&self, session_id: &SessionId) -> Result<ReceiverStream<DebateEvent>, EngineError> {
        let session = self
            .registry
            .get(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;

        // Reject if the debate is already being streamed
        if !session.try_begin_stream() {
            return Err(EngineError::AlreadyStreaming(session_id.to_string()));
        }

        let registry = Arc::clone(&self.registry);
        Ok(self.runner.spawn(session, move |session| {
            session.end_stream();
            registry.release(&session);
            info!(session_id = %session.id, "debate session closed");
        }))
    }

    fn stop(&self, session_id: &SessionId) -> Result<(), EngineError> {
        if !self.registry.mark_cancelled(session_id) {
            return Err(EngineError::SessionNotFound(session_id.to_string()));
        }
        self.registry.delete(session_id);
        info!(session_id = %session_id, "debate stop requested");
        Ok(())
    }

    fn models(&self) -> AvailableModels {
        available_models(&self.keys)
    }
}
