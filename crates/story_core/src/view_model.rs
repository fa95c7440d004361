use crate::update::status_for_failure;
use crate::{CyclePhase, FailureReason, GenerationKind, Message};

/// Shown instead of the media when either element fails to play.
pub const PLAYBACK_ERROR_TEXT: &str = "Error playing media. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationViewModel {
    pub kind: GenerationKind,
    pub phase: CyclePhase,
    pub messages: Vec<Message>,
    pub input: String,
    pub is_sending: bool,
    pub submit_enabled: bool,
    /// Loading or failure line shown in the media area.
    pub status_text: Option<String>,
    pub video_url: Option<String>,
    pub has_playback: bool,
    pub playback_error: Option<String>,
    pub dirty: bool,
}

impl ConversationViewModel {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build(
        kind: GenerationKind,
        phase: CyclePhase,
        messages: &[Message],
        input: &str,
        video_url: Option<&str>,
        has_playback: bool,
        last_failure: Option<&FailureReason>,
        playback_error: Option<&str>,
        dirty: bool,
    ) -> Self {
        let is_sending = phase.is_in_flight();
        let status_text = match (phase, last_failure) {
            (CyclePhase::Failed, Some(failure)) => Some(status_for_failure(kind, failure)),
            (CyclePhase::AwaitingTypingIndicator | CyclePhase::Polling, _) => {
                Some(format!("Generating {}...", kind.label()))
            }
            _ => None,
        };

        Self {
            kind,
            phase,
            messages: messages.to_vec(),
            input: input.to_string(),
            is_sending,
            submit_enabled: !is_sending && !input.trim().is_empty(),
            status_text,
            video_url: video_url.map(ToOwned::to_owned),
            has_playback,
            playback_error: playback_error.map(|_| PLAYBACK_ERROR_TEXT.to_string()),
            dirty,
        }
    }
}
