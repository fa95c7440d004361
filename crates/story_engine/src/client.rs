use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{GenerationResult, JobId, MediaKind};

const SUBMIT_VIDEO_PATH: &str = "api/generate/video/content";
const FETCH_VIDEO_PATH: &str = "api/get/video/content";
const SUBMIT_AUDIO_PATH: &str = "api/generate/audio/content";
const FETCH_AUDIO_PATH: &str = "api/get/audio/content";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    /// Knowledge collection the backend should draw on.
    pub rag_id: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            rag_id: "1".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

/// The four remote calls of the generation backend.
#[async_trait::async_trait]
pub trait MediaClient: Send + Sync {
    async fn submit_video_job(&self, prompt: &str) -> Result<JobId, ClientError>;

    async fn fetch_video_result(&self, job: &JobId) -> Result<GenerationResult, ClientError>;

    async fn submit_audio_job(&self, prompt: &str) -> Result<JobId, ClientError>;

    async fn fetch_audio_result(&self, job: &JobId) -> Result<GenerationResult, ClientError>;

    async fn submit(&self, kind: MediaKind, prompt: &str) -> Result<JobId, ClientError> {
        match kind {
            MediaKind::Video => self.submit_video_job(prompt).await,
            MediaKind::Audio => self.submit_audio_job(prompt).await,
        }
    }

    async fn fetch(&self, kind: MediaKind, job: &JobId) -> Result<GenerationResult, ClientError> {
        match kind {
            MediaKind::Video => self.fetch_video_result(job).await,
            MediaKind::Audio => self.fetch_audio_result(job).await,
        }
    }
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    prompt: &'a str,
    rag_id: &'a str,
}

/// Backends have been seen returning ids both as strings and as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_job_id(self) -> Result<JobId, ClientError> {
        match self {
            RawId::Text(text) if text.trim().is_empty() => {
                Err(ClientError::Decode("empty job id".to_string()))
            }
            RawId::Text(text) => Ok(JobId::new(text)),
            RawId::Number(number) => Ok(JobId::new(number.to_string())),
        }
    }
}

#[derive(Deserialize)]
struct VideoSubmitResponse {
    id: RawId,
}

#[derive(Deserialize)]
struct AudioSubmitResponse {
    unique_id: RawId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentResponse {
    video_url: Option<String>,
    audio_base64: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestMediaClient {
    settings: ClientSettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestMediaClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        // A trailing slash keeps any path prefix when endpoints are joined.
        let mut raw = settings.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw).map_err(|err| ClientError::InvalidUrl(err.to_string()))?;

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ClientError::Network(err.to_string()))?;

        Ok(Self {
            settings,
            base,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|err| ClientError::InvalidUrl(err.to_string()))
    }

    async fn submit_prompt<T: DeserializeOwned>(
        &self,
        path: &str,
        prompt: &str,
        default_message: &str,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        let body = SubmitRequest {
            prompt,
            rag_id: &self.settings.rag_id,
        };
        self.send_json(self.client.post(url).json(&body), default_message)
            .await
    }

    async fn fetch_content(
        &self,
        path: &str,
        job: &JobId,
        with_rag_id: bool,
        default_message: &str,
    ) -> Result<GenerationResult, ClientError> {
        let mut url = self.endpoint(path)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("id", job.as_str());
            if with_rag_id {
                query.append_pair("rag_id", &self.settings.rag_id);
            }
        }
        let content: ContentResponse = self
            .send_json(self.client.get(url), default_message)
            .await?;
        Ok(GenerationResult {
            media_url: content.video_url,
            audio_payload: content.audio_base64,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        default_message: &str,
    ) -> Result<T, ClientError> {
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|error| error.message)
                .unwrap_or_else(|| default_message.to_string());
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

#[async_trait::async_trait]
impl MediaClient for ReqwestMediaClient {
    async fn submit_video_job(&self, prompt: &str) -> Result<JobId, ClientError> {
        let response: VideoSubmitResponse = self
            .submit_prompt(SUBMIT_VIDEO_PATH, prompt, "Failed to generate video")
            .await?;
        response.id.into_job_id()
    }

    async fn fetch_video_result(&self, job: &JobId) -> Result<GenerationResult, ClientError> {
        self.fetch_content(FETCH_VIDEO_PATH, job, true, "Failed to fetch video content")
            .await
    }

    async fn submit_audio_job(&self, prompt: &str) -> Result<JobId, ClientError> {
        let response: AudioSubmitResponse = self
            .submit_prompt(SUBMIT_AUDIO_PATH, prompt, "Failed to generate audio")
            .await?;
        response.unique_id.into_job_id()
    }

    async fn fetch_audio_result(&self, job: &JobId) -> Result<GenerationResult, ClientError> {
        self.fetch_content(FETCH_AUDIO_PATH, job, false, "Failed to fetch audio content")
            .await
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::Timeout(err.to_string());
    }
    if err.is_decode() {
        return ClientError::Decode(err.to_string());
    }
    ClientError::Network(err.to_string())
}
