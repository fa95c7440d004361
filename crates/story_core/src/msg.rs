use crate::{CycleId, FailureReason, GeneratedMedia};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The view was mounted with its configuration.
    ViewOpened,
    /// User edited the prompt input box.
    InputChanged(String),
    /// User submitted the current prompt input.
    PromptSubmitted,
    /// The typing-indicator delay for a cycle has elapsed.
    TypingIndicatorElapsed { cycle: CycleId },
    /// The backend accepted the prompt and returned a job id.
    JobSubmitted { cycle: CycleId, job_id: String },
    /// Polling produced a ready result.
    GenerationReady {
        cycle: CycleId,
        media: GeneratedMedia,
    },
    /// Submit failed or polling ran out of budget.
    GenerationFailed {
        cycle: CycleId,
        failure: FailureReason,
    },
    /// One of the media elements failed to start or errored mid-playback.
    PlaybackFailed { reason: String },
    /// The view is going away; outstanding work must be cancelled.
    ViewClosed,
    /// Render tick; changes nothing by itself.
    Tick,
}
