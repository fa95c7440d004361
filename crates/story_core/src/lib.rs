//! Story core: pure conversation state machine and view-model helpers.
mod effect;
mod message;
mod msg;
mod route;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use message::{Message, MessageLog, PLACEHOLDER_TEXT};
pub use msg::Msg;
pub use route::{RouteError, ViewConfig};
pub use state::{
    ConversationState, CycleId, CyclePhase, FailureReason, GeneratedMedia, GenerationKind,
};
pub use update::{update, FAILURE_TEXT, TYPING_INDICATOR_DELAY};
pub use view_model::{ConversationViewModel, PLAYBACK_ERROR_TEXT};
