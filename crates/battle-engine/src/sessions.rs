use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use battle_core::ids::SessionId;
use battle_core::participant::Participant;

/// A started debate waiting to be (or being) streamed.
#[derive(Debug)]
pub struct DebateSession {
    pub id: SessionId,
    pub question: String,
    pub max_rounds: u32,
    pub participants: Vec<Participant>,
    cancelled: AtomicBool,
    streaming: AtomicBool,
}

impl DebateSession {
    pub fn new(id: SessionId, question: String, max_rounds: u32, participants: Vec<Participant>) -> Self {
        Self {
            id,
            question,
            max_rounds,
            participants,
            cancelled: AtomicBool::new(false),
            streaming: AtomicBool::new(false),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn clear_cancelled(&self) {
        self.cancelled.store(false, Ordering::Release);
    }

    /// Claim the session's event stream. Returns false if already claimed.
    pub fn try_begin_stream(&self) -> bool {
        !self.streaming.swap(true, Ordering::AcqRel)
    }

    pub fn end_stream(&self) {
        self.streaming.store(false, Ordering::Release);
    }
}

/// Live debate sessions keyed by id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<DebateSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, replacing any existing one with the same id.
    ///
    /// There is no expiry: a session that is never streamed or stopped
    /// stays registered for the life of the process.
    pub fn create(
        &self,
        id: Option<SessionId>,
        question: String,
        max_rounds: u32,
        participants: Vec<Participant>,
    ) -> SessionId {
        let id = id.unwrap_or_default();
        let session = Arc::new(DebateSession::new(id.clone(), question, max_rounds, participants));
        self.sessions.insert(id.clone(), session);
        id
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<DebateSession>> {
        self.sessions.get(id).map(|s| Arc::clone(s.value()))
    }

    pub fn mark_cancelled(&self, id: &SessionId) -> bool {
        self.sessions.get(id).map(|s| s.cancel()).is_some()
    }

    pub fn clear_cancellation(&self, id: &SessionId) -> bool {
        self.sessions.get(id).map(|s| s.clear_cancelled()).is_some()
    }

    pub fn delete(&self, id: &SessionId) -> Option<Arc<DebateSession>> {
        self.sessions.remove(id).map(|(_, s)| s)
    }

    /// Remove `session` only if it is still the registered entry for its id.
    pub fn release(&self, session: &Arc<DebateSession>) -> bool {
        self.sessions
            .remove_if(&session.id, |_, current| Arc::ptr_eq(current, session))
            .is_some()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
