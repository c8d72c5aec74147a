pub mod error;
pub mod prompt;
pub mod runner;
pub mod sessions;

pub use error::EngineError;
pub use prompt::build_prompt;
pub use runner::{DebateRunner, RunnerConfig};
pub use sessions::{DebateSession, SessionRegistry};
