pub mod error;
pub mod event_bridge;
pub mod orchestrator;
pub mod server;

pub use error::ApiError;
pub use orchestrator::{DebateLimits, DebateOrchestrator, DebateStarted, EngineOrchestrator, StartDebate};
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
