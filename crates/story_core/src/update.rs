use std::time::Duration;

use crate::{ConversationState, CycleId, Effect, FailureReason, GenerationKind, Msg};

/// Pause between echoing the prompt and showing the typing placeholder.
pub const TYPING_INDICATOR_DELAY: Duration = Duration::from_millis(500);

/// Terminal message for a failed cycle, whatever the cause.
pub const FAILURE_TEXT: &str = "Sorry, I couldn't process that request. Please try again.";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: ConversationState, msg: Msg) -> (ConversationState, Vec<Effect>) {
    if state.is_closed() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::ViewOpened => {
            if !state.open() {
                return (state, Vec::new());
            }
            match state.config().initial_story().map(ToOwned::to_owned) {
                Some(story) if !state.is_sending() => begin_cycle(&mut state, story),
                _ => Vec::new(),
            }
        }
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::PromptSubmitted => {
            // Overlapping cycles are never started; the input is kept for later.
            if state.is_sending() || state.input().trim().is_empty() {
                return (state, Vec::new());
            }
            let prompt = state.take_input().trim().to_string();
            begin_cycle(&mut state, prompt)
        }
        Msg::TypingIndicatorElapsed { cycle } => match state.start_polling(cycle) {
            Some(prompt) => vec![Effect::StartGeneration {
                cycle,
                kind: state.kind(),
                prompt,
            }],
            None => Vec::new(),
        },
        Msg::JobSubmitted { cycle, job_id } => {
            state.record_job(cycle, job_id);
            Vec::new()
        }
        Msg::GenerationReady { cycle, media } => {
            if state.complete_ready(cycle, &media, success_text(state.kind())) {
                vec![Effect::AdoptPlayback { cycle, media }]
            } else {
                Vec::new()
            }
        }
        Msg::GenerationFailed { cycle, failure } => {
            state.complete_failed(cycle, failure, FAILURE_TEXT);
            Vec::new()
        }
        Msg::PlaybackFailed { reason } => {
            state.set_playback_error(reason);
            Vec::new()
        }
        Msg::ViewClosed => {
            let mut effects = Vec::with_capacity(2);
            if let Some(cycle) = state.close() {
                effects.push(Effect::CancelGeneration { cycle });
            }
            effects.push(Effect::ReleasePlayback);
            effects
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

fn begin_cycle(state: &mut ConversationState, prompt: String) -> Vec<Effect> {
    let cycle: CycleId = state.begin_cycle(prompt);
    vec![Effect::ScheduleTypingIndicator {
        cycle,
        delay: TYPING_INDICATOR_DELAY,
    }]
}

pub(crate) fn success_text(kind: GenerationKind) -> &'static str {
    match kind {
        GenerationKind::Video => "Your video is ready!",
        GenerationKind::Audio => "Your audio is ready!",
    }
}

pub(crate) fn status_for_failure(kind: GenerationKind, failure: &FailureReason) -> String {
    match failure {
        FailureReason::Request(_) => {
            format!("Failed to generate {}. Please try again.", kind.label())
        }
        FailureReason::TimedOut { .. } => match kind {
            GenerationKind::Video => "Video generation timed out. Please try again.".to_string(),
            GenerationKind::Audio => "Audio generation timed out. Please try again.".to_string(),
        },
    }
}
