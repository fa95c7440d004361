mod common;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{
    calls, init_logging, ready_video, CallLog, CountingStore, FakeElement, ScriptedClient,
};
use pretty_assertions::assert_eq;
use story_core::{
    update, ConversationState, CyclePhase, Effect, FailureReason, GeneratedMedia, GenerationKind,
    Message, Msg, ViewConfig, FAILURE_TEXT,
};
use story_engine::{
    run_generation, CancellationToken, GenerationFailure, GenerationOutcome, MediaElement,
    MediaKind, PairId, PlaybackPair, PlaybackSynchronizer, PollSettings, ResourceStore, ResourceUrl,
    ScopedResource, AUDIO_MIME,
};
use tokio::time::Instant;

/// Drives the conversation state machine against a scripted backend, one message at a time.
struct Harness {
    state: ConversationState,
    client: Arc<ScriptedClient>,
    settings: PollSettings,
    sync: PlaybackSynchronizer,
    store: Arc<CountingStore>,
    elements: CallLog,
}

impl Harness {
    fn new(kind: GenerationKind, client: ScriptedClient, settings: PollSettings) -> Self {
        Self {
            state: ConversationState::new(ViewConfig::new(kind)),
            client: Arc::new(client),
            settings,
            sync: PlaybackSynchronizer::new(),
            store: Arc::new(CountingStore::default()),
            elements: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn submit(&mut self, prompt: &str) {
        self.dispatch(Msg::InputChanged(prompt.to_string())).await;
        self.dispatch(Msg::PromptSubmitted).await;
    }

    async fn dispatch(&mut self, msg: Msg) {
        let mut queue = VecDeque::from([msg]);
        while let Some(msg) = queue.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            for effect in effects {
                queue.extend(self.run_effect(effect).await);
            }
        }
    }

    async fn run_effect(&mut self, effect: Effect) -> Vec<Msg> {
        match effect {
            Effect::ScheduleTypingIndicator { cycle, delay } => {
                tokio::time::sleep(delay).await;
                vec![Msg::TypingIndicatorElapsed { cycle }]
            }
            Effect::StartGeneration {
                cycle,
                kind,
                prompt,
            } => {
                let mut submitted = None;
                let outcome = run_generation(
                    self.client.as_ref(),
                    media_kind(kind),
                    &prompt,
                    self.settings,
                    &CancellationToken::new(),
                    |job| submitted = Some(job.id.to_string()),
                )
                .await;
                let mut msgs: Vec<Msg> = submitted
                    .map(|job_id| Msg::JobSubmitted { cycle, job_id })
                    .into_iter()
                    .collect();
                msgs.extend(match outcome {
                    GenerationOutcome::Ready(media) => Some(Msg::GenerationReady {
                        cycle,
                        media: GeneratedMedia {
                            video_url: media.video_url,
                            audio: media.audio,
                        },
                    }),
                    GenerationOutcome::Failed(GenerationFailure::TimedOut { attempts }) => {
                        Some(Msg::GenerationFailed {
                            cycle,
                            failure: FailureReason::TimedOut { attempts },
                        })
                    }
                    GenerationOutcome::Failed(other) => Some(Msg::GenerationFailed {
                        cycle,
                        failure: FailureReason::Request(other.to_string()),
                    }),
                    GenerationOutcome::Cancelled => None,
                });
                msgs
            }
            Effect::AdoptPlayback { media, .. } => {
                let store: Arc<dyn ResourceStore> = self.store.clone();
                let audio = ScopedResource::acquire(store, &media.audio, AUDIO_MIME)
                    .expect("in-memory resource");
                let video: Option<Box<dyn MediaElement>> = media
                    .video_url
                    .as_ref()
                    .map(|_| Box::new(FakeElement::new("video", &self.elements)) as _);
                let audio_element = Box::new(FakeElement::new("audio", &self.elements));
                let pair =
                    PlaybackPair::new(PairId::next(), video, audio_element).with_resource(audio);
                match self.sync.attach(pair) {
                    Ok(()) => Vec::new(),
                    Err(err) => vec![Msg::PlaybackFailed { reason: err.reason }],
                }
            }
            Effect::ReleasePlayback => {
                self.sync.detach();
                Vec::new()
            }
            Effect::CancelGeneration { .. } => Vec::new(),
        }
    }
}

fn media_kind(kind: GenerationKind) -> MediaKind {
    match kind {
        GenerationKind::Video => MediaKind::Video,
        GenerationKind::Audio => MediaKind::Audio,
    }
}

fn two_second_polling(attempts: u32) -> PollSettings {
    PollSettings::with_max_attempts(Duration::from_millis(2_000), attempts)
}

fn assert_near(actual: Duration, expected_ms: u64) {
    let actual_ms = actual.as_millis() as u64;
    assert!(
        actual_ms.abs_diff(expected_ms) <= 50,
        "expected ~{expected_ms}ms, got {actual_ms}ms"
    );
}

#[tokio::test(start_paused = true)]
async fn video_story_becomes_ready_and_plays_muted_video_with_narration() {
    init_logging();
    let client = ScriptedClient::new("abc123")
        .not_ready_times(2)
        .then(Ok(ready_video()));
    let mut harness = Harness::new(GenerationKind::Video, client, two_second_polling(150));
    let started = Instant::now();

    harness.submit("Rabbit and turtle race in the forest").await;

    // Typing indicator delay, then three two-second polling ticks.
    assert_near(started.elapsed(), 6_500);
    assert_eq!(harness.state.phase(), CyclePhase::Ready);
    assert_eq!(
        harness.state.messages(),
        &[
            Message::user("Rabbit and turtle race in the forest"),
            Message::assistant("Your video is ready!"),
        ]
    );
    assert_eq!(harness.client.fetch_count(), 3);
    assert_eq!(
        calls(&harness.elements),
        vec!["video:mute", "video:play", "audio:play"]
    );
    assert_eq!(harness.store.created(), 1);

    let view = harness.state.view();
    assert_eq!(view.video_url.as_deref(), Some(common::VIDEO_URL));
    assert!(view.has_playback);
    assert!(!view.is_sending);
}

#[tokio::test(start_paused = true)]
async fn never_ready_job_times_out_after_its_budget() {
    init_logging();
    let client = ScriptedClient::new("abc123");
    let mut harness = Harness::new(GenerationKind::Video, client, two_second_polling(3));
    let started = Instant::now();

    harness.submit("The story of a dinosaur").await;

    assert_near(started.elapsed(), 6_500);
    assert_eq!(harness.client.fetch_count(), 3);
    assert_eq!(harness.state.phase(), CyclePhase::Failed);
    assert_eq!(
        harness.state.messages().last(),
        Some(&Message::assistant(FAILURE_TEXT))
    );
    assert_eq!(harness.state.messages().len(), 2);
    assert!(!harness.sync.is_attached());
    assert_eq!(
        harness.state.view().status_text.as_deref(),
        Some("Video generation timed out. Please try again.")
    );
}

#[tokio::test(start_paused = true)]
async fn second_story_replaces_playback_and_close_releases_it() {
    init_logging();
    let client = ScriptedClient::new("abc123")
        .then(Ok(ready_video()))
        .then(Ok(ready_video()));
    let mut harness = Harness::new(GenerationKind::Video, client, two_second_polling(5));

    harness.submit("first").await;
    harness.submit("second").await;

    assert_eq!(harness.state.messages().len(), 4);
    assert_eq!(harness.client.submit_count(), 2);
    assert_eq!(harness.store.revoked(), vec![ResourceUrl::new("mem://1")]);
    assert!(harness.sync.is_attached());

    harness.dispatch(Msg::ViewClosed).await;

    assert!(!harness.sync.is_attached());
    assert_eq!(
        harness.store.revoked(),
        vec![ResourceUrl::new("mem://1"), ResourceUrl::new("mem://2")]
    );
    assert!(harness.state.is_closed());
}

#[tokio::test(start_paused = true)]
async fn audio_story_plays_narration_only() {
    init_logging();
    let client = ScriptedClient::new("u1").then(Ok(common::ready_audio()));
    let mut harness = Harness::new(GenerationKind::Audio, client, two_second_polling(5));

    harness.submit("listen to this").await;

    assert_eq!(
        harness.state.messages().last(),
        Some(&Message::assistant("Your audio is ready!"))
    );
    assert_eq!(calls(&harness.elements), vec!["audio:play"]);
}
