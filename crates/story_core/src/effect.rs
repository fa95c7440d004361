use std::time::Duration;

use crate::{CycleId, GeneratedMedia, GenerationKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver `Msg::TypingIndicatorElapsed` for `cycle` after `delay`.
    ScheduleTypingIndicator { cycle: CycleId, delay: Duration },
    /// Submit the prompt, then poll the returned job until ready or out of budget.
    StartGeneration {
        cycle: CycleId,
        kind: GenerationKind,
        prompt: String,
    },
    /// Stop any timers and requests belonging to `cycle`.
    CancelGeneration { cycle: CycleId },
    /// Replace the current playback pair with one built from `media`.
    AdoptPlayback {
        cycle: CycleId,
        media: GeneratedMedia,
    },
    /// Detach the current playback pair and revoke its resources.
    ReleasePlayback,
}
