//! Assistant widget integration — persisted settings, live state, and the
//! progress notifier that feeds it messages.

pub mod model;
pub mod notifier;

pub use model::{AssistantChannel, AssistantSettings, AssistantState, Personality, SharedAssistant};
pub use notifier::{AssistantNotifier, Milestone};
