#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use story_engine::{
    ClientError, GenerationResult, JobId, MediaClient, MediaElement, PlaybackError,
    ResourceError, ResourceStore, ResourceUrl,
};

pub const NARRATION_B64: &str = "bmFycmF0aW9u";
pub const VIDEO_URL: &str = "https://x/video.mp4";

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(story_logging::initialize_for_tests);
}

pub fn not_ready() -> GenerationResult {
    GenerationResult::default()
}

pub fn ready_video() -> GenerationResult {
    GenerationResult {
        media_url: Some(VIDEO_URL.to_string()),
        audio_payload: Some(NARRATION_B64.to_string()),
    }
}

pub fn ready_audio() -> GenerationResult {
    GenerationResult {
        media_url: None,
        audio_payload: Some(NARRATION_B64.to_string()),
    }
}

/// Media client that replays a fixed script of poll responses.
///
/// Once the script is exhausted every fetch answers "not ready".
pub struct ScriptedClient {
    submit: Result<JobId, ClientError>,
    responses: Mutex<VecDeque<Result<GenerationResult, ClientError>>>,
    fetch_delay: Duration,
    submits: AtomicUsize,
    fetches: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(job_id: &str) -> Self {
        Self {
            submit: Ok(JobId::new(job_id)),
            responses: Mutex::new(VecDeque::new()),
            fetch_delay: Duration::ZERO,
            submits: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing_submit(err: ClientError) -> Self {
        Self {
            submit: Err(err),
            ..Self::new("unused")
        }
    }

    pub fn then(self, response: Result<GenerationResult, ClientError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn not_ready_times(mut self, times: usize) -> Self {
        for _ in 0..times {
            self = self.then(Ok(not_ready()));
        }
        self
    }

    /// Every fetch takes `delay` (in tokio time) before answering.
    pub fn slow_fetches(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn next_submit(&self) -> Result<JobId, ClientError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.submit.clone()
    }

    async fn next_fetch(&self) -> Result<GenerationResult, ClientError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(not_ready()))
    }
}

#[async_trait::async_trait]
impl MediaClient for ScriptedClient {
    async fn submit_video_job(&self, _prompt: &str) -> Result<JobId, ClientError> {
        self.next_submit()
    }

    async fn fetch_video_result(&self, _job: &JobId) -> Result<GenerationResult, ClientError> {
        self.next_fetch().await
    }

    async fn submit_audio_job(&self, _prompt: &str) -> Result<JobId, ClientError> {
        self.next_submit()
    }

    async fn fetch_audio_result(&self, _job: &JobId) -> Result<GenerationResult, ClientError> {
        self.next_fetch().await
    }
}

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Media element that records every call as `"<name>:<call>"`.
pub struct FakeElement {
    name: &'static str,
    log: CallLog,
    ended: Arc<AtomicBool>,
    fail_play: bool,
}

impl FakeElement {
    pub fn new(name: &'static str, log: &CallLog) -> Self {
        Self {
            name,
            log: log.clone(),
            ended: Arc::new(AtomicBool::new(false)),
            fail_play: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_play = true;
        self
    }

    /// Handle for flipping the element's ended state from a test.
    pub fn ended_flag(&self) -> Arc<AtomicBool> {
        self.ended.clone()
    }

    fn record(&self, call: &str) {
        self.log.lock().unwrap().push(format!("{}:{}", self.name, call));
    }
}

impl MediaElement for FakeElement {
    fn play(&mut self) -> Result<(), PlaybackError> {
        self.record("play");
        if self.fail_play {
            return Err(PlaybackError::new(format!("{} cannot start", self.name)));
        }
        self.ended.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) {
        self.record("pause");
    }

    fn set_muted(&mut self, muted: bool) {
        self.record(if muted { "mute" } else { "unmute" });
    }

    fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    fn release(&mut self) {
        self.record("release");
    }
}

/// In-memory resource store that records revocations.
#[derive(Default)]
pub struct CountingStore {
    created: AtomicUsize,
    revoked: Mutex<Vec<ResourceUrl>>,
}

impl CountingStore {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn revoked(&self) -> Vec<ResourceUrl> {
        self.revoked.lock().unwrap().clone()
    }
}

impl ResourceStore for CountingStore {
    fn create(&self, _bytes: &[u8], _mime: &str) -> Result<ResourceUrl, ResourceError> {
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ResourceUrl::new(format!("mem://{n}")))
    }

    fn revoke(&self, url: &ResourceUrl) {
        self.revoked.lock().unwrap().push(url.clone());
    }
}
