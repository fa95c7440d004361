use crate::view_model::ConversationViewModel;
use crate::{Message, MessageLog, ViewConfig};

pub type CycleId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationKind {
    #[default]
    Video,
    Audio,
}

impl GenerationKind {
    pub fn label(self) -> &'static str {
        match self {
            GenerationKind::Video => "video",
            GenerationKind::Audio => "audio",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePhase {
    #[default]
    Idle,
    AwaitingTypingIndicator,
    Polling,
    Ready,
    Failed,
}

impl CyclePhase {
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::AwaitingTypingIndicator | Self::Polling)
    }
}

/// A ready result, with the audio payload already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMedia {
    pub video_url: Option<String>,
    pub audio: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The submit call was rejected or could not be made.
    Request(String),
    /// Polling exhausted its budget without a ready result.
    TimedOut { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveCycle {
    id: CycleId,
    prompt: String,
    job_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationState {
    config: ViewConfig,
    phase: CyclePhase,
    log: MessageLog,
    input: String,
    last_cycle: CycleId,
    active: Option<ActiveCycle>,
    adopted_cycle: Option<CycleId>,
    video_url: Option<String>,
    last_failure: Option<FailureReason>,
    playback_error: Option<String>,
    opened: bool,
    closed: bool,
    dirty: bool,
}

impl ConversationState {
    pub fn new(config: ViewConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn kind(&self) -> GenerationKind {
        self.config.kind()
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn messages(&self) -> &[Message] {
        self.log.entries()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Re-entrancy guard: true while a cycle is between submission and its terminal message.
    pub fn is_sending(&self) -> bool {
        self.phase.is_in_flight()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn current_cycle(&self) -> Option<CycleId> {
        self.active.as_ref().map(|cycle| cycle.id)
    }

    pub fn active_job_id(&self) -> Option<&str> {
        self.active.as_ref().and_then(|cycle| cycle.job_id.as_deref())
    }

    pub fn last_failure(&self) -> Option<&FailureReason> {
        self.last_failure.as_ref()
    }

    pub fn playback_error(&self) -> Option<&str> {
        self.playback_error.as_deref()
    }

    pub fn view(&self) -> ConversationViewModel {
        ConversationViewModel::build(
            self.config.kind(),
            self.phase,
            self.log.entries(),
            &self.input,
            self.video_url.as_deref(),
            self.adopted_cycle.is_some(),
            self.last_failure.as_ref(),
            self.playback_error.as_deref(),
            self.dirty,
        )
    }

    /// Returns whether anything visible changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_input(&mut self, text: String) {
        if self.input != text {
            self.input = text;
            self.mark_dirty();
        }
    }

    pub(crate) fn take_input(&mut self) -> String {
        self.mark_dirty();
        std::mem::take(&mut self.input)
    }

    /// Marks the view as opened; returns false if it already was.
    pub(crate) fn open(&mut self) -> bool {
        !std::mem::replace(&mut self.opened, true)
    }

    pub(crate) fn close(&mut self) -> Option<CycleId> {
        self.closed = true;
        self.adopted_cycle = None;
        self.video_url = None;
        self.mark_dirty();
        if self.phase.is_in_flight() {
            self.phase = CyclePhase::Idle;
        }
        self.active.take().map(|cycle| cycle.id)
    }

    /// Starts a fresh cycle: echoes the prompt and waits for the typing indicator.
    pub(crate) fn begin_cycle(&mut self, prompt: String) -> CycleId {
        self.last_cycle += 1;
        let id = self.last_cycle;
        self.log.push(Message::user(prompt.clone()));
        self.active = Some(ActiveCycle {
            id,
            prompt,
            job_id: None,
        });
        self.phase = CyclePhase::AwaitingTypingIndicator;
        self.last_failure = None;
        self.mark_dirty();
        id
    }

    pub(crate) fn is_current(&self, cycle: CycleId) -> bool {
        self.current_cycle() == Some(cycle)
    }

    /// Shows the placeholder and moves to polling; returns the prompt to submit.
    pub(crate) fn start_polling(&mut self, cycle: CycleId) -> Option<String> {
        if !self.is_current(cycle) || self.phase != CyclePhase::AwaitingTypingIndicator {
            return None;
        }
        self.log.push_placeholder();
        self.phase = CyclePhase::Polling;
        self.mark_dirty();
        self.active.as_ref().map(|active| active.prompt.clone())
    }

    pub(crate) fn record_job(&mut self, cycle: CycleId, job_id: String) -> bool {
        match self.active.as_mut() {
            Some(active) if active.id == cycle && self.phase == CyclePhase::Polling => {
                active.job_id = Some(job_id);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn complete_ready(
        &mut self,
        cycle: CycleId,
        media: &GeneratedMedia,
        text: &str,
    ) -> bool {
        if !self.is_current(cycle) || self.phase != CyclePhase::Polling {
            return false;
        }
        self.log.replace_placeholder(Message::assistant(text));
        self.active = None;
        self.phase = CyclePhase::Ready;
        self.adopted_cycle = Some(cycle);
        self.video_url = media.video_url.clone();
        self.playback_error = None;
        self.mark_dirty();
        true
    }

    pub(crate) fn complete_failed(
        &mut self,
        cycle: CycleId,
        failure: FailureReason,
        text: &str,
    ) -> bool {
        if !self.is_current(cycle) || self.phase != CyclePhase::Polling {
            return false;
        }
        self.log.replace_placeholder(Message::assistant(text));
        self.active = None;
        self.phase = CyclePhase::Failed;
        self.last_failure = Some(failure);
        self.mark_dirty();
        true
    }

    pub(crate) fn set_playback_error(&mut self, reason: String) {
        self.playback_error = Some(reason);
        self.mark_dirty();
    }
}
