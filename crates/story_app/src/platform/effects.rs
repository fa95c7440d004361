use std::sync::{mpsc, Arc};

use story_core::{Effect, FailureReason, GeneratedMedia, GenerationKind, Msg};
use story_engine::{
    EngineEvent, EngineHandle, GenerationFailure, MediaElement, MediaEvent, MediaKind, PairId,
    PlaybackPair, PlaybackSynchronizer, ResourceStore, ScopedResource, StreamKind, AUDIO_MIME,
};
use story_logging::{story_info, story_warn};

use super::player::{CommandElement, PlayerCommand, SilentElement};

/// Configured external players. Missing players fall back to `SilentElement`.
#[derive(Debug, Clone, Default)]
pub struct Players {
    pub video: Option<PlayerCommand>,
    pub audio: Option<PlayerCommand>,
    pub video_mute_arg: Option<String>,
}

/// Executes core effects against the engine and the playback synchronizer.
pub struct EffectRunner {
    engine: EngineHandle,
    sync: PlaybackSynchronizer,
    store: Arc<dyn ResourceStore>,
    players: Players,
    media_tx: mpsc::Sender<(PairId, MediaEvent)>,
    media_rx: mpsc::Receiver<(PairId, MediaEvent)>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, store: Arc<dyn ResourceStore>, players: Players) -> Self {
        let (media_tx, media_rx) = mpsc::channel();
        Self {
            engine,
            sync: PlaybackSynchronizer::new(),
            store,
            players,
            media_tx,
            media_rx,
        }
    }

    /// Runs `effects`; returns messages produced synchronously (playback start failures).
    pub fn enqueue(&mut self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut msgs = Vec::new();
        for effect in effects {
            match effect {
                Effect::ScheduleTypingIndicator { cycle, delay } => {
                    self.engine.schedule_delay(cycle, delay);
                }
                Effect::StartGeneration {
                    cycle,
                    kind,
                    prompt,
                } => {
                    story_info!(
                        "StartGeneration cycle={} kind={} prompt_len={}",
                        cycle,
                        kind.label(),
                        prompt.len()
                    );
                    self.engine.start_generation(cycle, media_kind(kind), prompt);
                }
                Effect::CancelGeneration { cycle } => self.engine.cancel(cycle),
                Effect::AdoptPlayback { cycle, media } => {
                    story_info!("AdoptPlayback cycle={}", cycle);
                    msgs.extend(self.adopt(media));
                }
                Effect::ReleasePlayback => self.sync.detach(),
            }
        }
        msgs
    }

    /// Collects pending engine results and player notifications as messages.
    pub fn drain(&mut self) -> Vec<Msg> {
        let mut msgs = Vec::new();
        while let Some(event) = self.engine.try_recv() {
            msgs.push(map_engine_event(event));
        }
        while let Ok((pair, event)) = self.media_rx.try_recv() {
            if let Some(err) = self.sync.handle_event(pair, event) {
                msgs.push(Msg::PlaybackFailed { reason: err.reason });
            }
        }
        msgs
    }

    fn adopt(&mut self, media: GeneratedMedia) -> Option<Msg> {
        let audio_resource =
            match ScopedResource::acquire(self.store.clone(), &media.audio, AUDIO_MIME) {
                Ok(resource) => resource,
                Err(err) => {
                    story_warn!("Could not store narration: {}", err);
                    return Some(Msg::PlaybackFailed {
                        reason: err.to_string(),
                    });
                }
            };

        let id = PairId::next();
        let audio = self.element(id, StreamKind::Audio, audio_resource.url().as_str());
        let video = media
            .video_url
            .as_deref()
            .map(|url| self.element(id, StreamKind::Video, url));
        let pair = PlaybackPair::new(id, video, audio).with_resource(audio_resource);

        match self.sync.attach(pair) {
            Ok(()) => None,
            Err(err) => Some(Msg::PlaybackFailed { reason: err.reason }),
        }
    }

    fn element(&self, pair: PairId, stream: StreamKind, target: &str) -> Box<dyn MediaElement> {
        let command = match stream {
            StreamKind::Video => self.players.video.clone(),
            StreamKind::Audio => self.players.audio.clone(),
        };
        match command {
            Some(command) => {
                let element =
                    CommandElement::new(stream, pair, command, target, self.media_tx.clone());
                match stream {
                    StreamKind::Video => {
                        Box::new(element.with_mute_arg(self.players.video_mute_arg.clone()))
                    }
                    StreamKind::Audio => Box::new(element),
                }
            }
            None => Box::new(SilentElement::new(stream, target)),
        }
    }
}

fn media_kind(kind: GenerationKind) -> MediaKind {
    match kind {
        GenerationKind::Video => MediaKind::Video,
        GenerationKind::Audio => MediaKind::Audio,
    }
}

fn map_engine_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::DelayElapsed { cycle } => Msg::TypingIndicatorElapsed { cycle },
        EngineEvent::JobSubmitted { cycle, job } => Msg::JobSubmitted {
            cycle,
            job_id: job.id.to_string(),
        },
        EngineEvent::GenerationCompleted {
            cycle,
            result: Ok(media),
        } => Msg::GenerationReady {
            cycle,
            media: GeneratedMedia {
                video_url: media.video_url,
                audio: media.audio,
            },
        },
        EngineEvent::GenerationCompleted {
            cycle,
            result: Err(failure),
        } => {
            story_warn!("Cycle {} failed: {}", cycle, failure);
            Msg::GenerationFailed {
                cycle,
                failure: map_failure(failure),
            }
        }
    }
}

fn map_failure(failure: GenerationFailure) -> FailureReason {
    match failure {
        GenerationFailure::TimedOut { attempts } => FailureReason::TimedOut { attempts },
        GenerationFailure::Request(reason) => FailureReason::Request(reason),
        other => FailureReason::Request(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use story_core::{FailureReason, GeneratedMedia, Msg};
    use story_engine::{EngineEvent, GenerationFailure, GenerationJob, JobId, MediaKind, ReadyMedia};

    use super::map_engine_event;

    #[test]
    fn delay_becomes_typing_indicator() {
        assert_eq!(
            map_engine_event(EngineEvent::DelayElapsed { cycle: 4 }),
            Msg::TypingIndicatorElapsed { cycle: 4 }
        );
    }

    #[test]
    fn submitted_job_carries_its_id() {
        let job = GenerationJob::new(JobId::new("abc123"), MediaKind::Video);
        assert_eq!(
            map_engine_event(EngineEvent::JobSubmitted { cycle: 1, job }),
            Msg::JobSubmitted {
                cycle: 1,
                job_id: "abc123".to_string(),
            }
        );
    }

    #[test]
    fn ready_media_is_forwarded() {
        let event = EngineEvent::GenerationCompleted {
            cycle: 2,
            result: Ok(ReadyMedia {
                video_url: Some("https://x/video.mp4".to_string()),
                audio: vec![1, 2],
            }),
        };
        assert_eq!(
            map_engine_event(event),
            Msg::GenerationReady {
                cycle: 2,
                media: GeneratedMedia {
                    video_url: Some("https://x/video.mp4".to_string()),
                    audio: vec![1, 2],
                },
            }
        );
    }

    #[test]
    fn failures_keep_timeout_distinct() {
        let timed_out = EngineEvent::GenerationCompleted {
            cycle: 3,
            result: Err(GenerationFailure::TimedOut { attempts: 150 }),
        };
        assert_eq!(
            map_engine_event(timed_out),
            Msg::GenerationFailed {
                cycle: 3,
                failure: FailureReason::TimedOut { attempts: 150 },
            }
        );

        let bad_payload = EngineEvent::GenerationCompleted {
            cycle: 3,
            result: Err(GenerationFailure::InvalidPayload("empty".to_string())),
        };
        assert_eq!(
            map_engine_event(bad_payload),
            Msg::GenerationFailed {
                cycle: 3,
                failure: FailureReason::Request("invalid payload: empty".to_string()),
            }
        );
    }
}
