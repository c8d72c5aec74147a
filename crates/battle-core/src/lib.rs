pub mod errors;
pub mod events;
pub mod ids;
pub mod participant;
pub mod provider;
pub mod security;
pub mod stream;

pub use errors::GatewayError;
pub use events::{DebateEvent, EndReason, EventKind};
pub use ids::{MessageId, SessionId};
pub use participant::{participants_or_default, Participant, ProviderKind};
pub use provider::{CompletionOptions, LlmProvider, ProviderStream};
pub use security::{ApiKey, ApiKeys};
pub use stream::StreamEvent;
