use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use story_logging::{story_debug, story_info, story_warn};

use crate::ScopedResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Video => write!(f, "video"),
            StreamKind::Audio => write!(f, "audio"),
        }
    }
}

/// Identifies one adopted pair, so events from a replaced pair can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairId(u64);

impl PairId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pair-{}", self.0)
    }
}

/// Notifications pushed by a media element while it plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    Ended(StreamKind),
    Error { stream: StreamKind, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("playback failed: {reason}")]
pub struct PlaybackError {
    pub reason: String,
}

impl PlaybackError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A playable handle, the analog of an HTML media element.
pub trait MediaElement: Send {
    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    fn set_muted(&mut self, muted: bool);

    fn has_ended(&self) -> bool;

    /// Drops event subscriptions. Called once when the pair is detached.
    fn release(&mut self) {}
}

/// Video and audio adopted together, plus the local resources backing them.
pub struct PlaybackPair {
    id: PairId,
    video: Option<Box<dyn MediaElement>>,
    audio: Box<dyn MediaElement>,
    resources: Vec<ScopedResource>,
    released: bool,
}

impl PlaybackPair {
    /// `id` is the tag the elements put on the events they report.
    pub fn new(
        id: PairId,
        video: Option<Box<dyn MediaElement>>,
        audio: Box<dyn MediaElement>,
    ) -> Self {
        Self {
            id,
            video,
            audio,
            resources: Vec::new(),
            released: false,
        }
    }

    /// Ties `resource` to this pair's lifetime.
    pub fn with_resource(mut self, resource: ScopedResource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        if let Some(video) = self.video.as_mut() {
            video.pause();
            video.release();
        }
        self.audio.pause();
        self.audio.release();
        for resource in &mut self.resources {
            resource.release();
        }
    }
}

impl Drop for PlaybackPair {
    fn drop(&mut self) {
        self.release();
    }
}

/// Keeps a video and its narration in step, with audio as the timing authority.
///
/// When the audio ends the video is paused; when the video ends first it is
/// played again (without seeking) so the narration keeps a visual.
#[derive(Default)]
pub struct PlaybackSynchronizer {
    pair: Option<PlaybackPair>,
    error: Option<PlaybackError>,
}

impl PlaybackSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts `pair`, releasing any previous one first, and starts both streams.
    ///
    /// A start failure on either stream is reported as one error; the pair stays
    /// attached so that `detach` still cleans it up.
    pub fn attach(&mut self, mut pair: PlaybackPair) -> Result<(), PlaybackError> {
        self.detach();

        let video_started = match pair.video.as_mut() {
            Some(video) => {
                video.set_muted(true);
                video.play()
            }
            None => Ok(()),
        };
        let audio_started = pair.audio.play();
        let has_video = pair.has_video();
        let id = pair.id;
        self.pair = Some(pair);

        match video_started.and(audio_started) {
            Ok(()) => {
                story_info!("Playback of {} started (video: {})", id, has_video);
                Ok(())
            }
            Err(err) => {
                story_warn!("Playback failed to start: {}", err);
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Applies a notification from the elements of pair `from`.
    ///
    /// Events from any pair but the attached one are ignored. Returns an error
    /// if the event put playback in the error state.
    pub fn handle_event(&mut self, from: PairId, event: MediaEvent) -> Option<PlaybackError> {
        let pair = self.pair.as_mut()?;
        if pair.id != from {
            story_debug!("Ignoring {:?} from replaced {}", event, from);
            return None;
        }
        match event {
            MediaEvent::Ended(StreamKind::Audio) => {
                story_debug!("Audio ended; pausing video");
                if let Some(video) = pair.video.as_mut() {
                    video.pause();
                }
                None
            }
            MediaEvent::Ended(StreamKind::Video) => {
                if pair.audio.has_ended() {
                    return None;
                }
                story_debug!("Video ended before audio; resuming video");
                let video = pair.video.as_mut()?;
                match video.play() {
                    Ok(()) => None,
                    Err(err) => {
                        story_warn!("Video failed to resume: {}", err);
                        self.error = Some(err.clone());
                        Some(err)
                    }
                }
            }
            MediaEvent::Error { stream, reason } => {
                story_warn!("{} playback error: {}", stream, reason);
                let err = PlaybackError::new(format!("{stream}: {reason}"));
                self.error = Some(err.clone());
                Some(err)
            }
        }
    }

    /// Releases the current pair, if any. Safe to call repeatedly.
    pub fn detach(&mut self) {
        if let Some(mut pair) = self.pair.take() {
            pair.release();
            story_debug!("Playback pair detached");
        }
        self.error = None;
    }

    pub fn is_attached(&self) -> bool {
        self.pair.is_some()
    }

    pub fn error(&self) -> Option<&PlaybackError> {
        self.error.as_ref()
    }
}

impl Drop for PlaybackSynchronizer {
    fn drop(&mut self) {
        self.detach();
    }
}
