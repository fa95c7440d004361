use story_logging::{story_info, story_warn};
use tokio_util::sync::CancellationToken;

use crate::{
    decode_audio_payload, poll, GenerationFailure, GenerationJob, MediaClient, MediaKind,
    PollError, PollSettings, ReadyMedia,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Ready(ReadyMedia),
    Failed(GenerationFailure),
    Cancelled,
}

/// Submits `prompt`, polls the returned job and decodes the ready result.
///
/// `on_submitted` is called once the backend has accepted the job.
pub async fn run_generation<F>(
    client: &dyn MediaClient,
    kind: MediaKind,
    prompt: &str,
    settings: PollSettings,
    cancel: &CancellationToken,
    on_submitted: F,
) -> GenerationOutcome
where
    F: FnOnce(&GenerationJob) + Send,
{
    let submitted = tokio::select! {
        biased;
        _ = cancel.cancelled() => return GenerationOutcome::Cancelled,
        submitted = client.submit(kind, prompt) => submitted,
    };

    let job = match submitted {
        Ok(id) => GenerationJob::new(id, kind),
        Err(err) => {
            story_warn!("Submitting {} prompt failed: {}", kind, err);
            return GenerationOutcome::Failed(GenerationFailure::Request(err.to_string()));
        }
    };
    story_info!("Submitted {} job {}", kind, job.id);
    on_submitted(&job);

    let result = match poll(client, &job, settings, cancel).await {
        Ok(result) => result,
        Err(PollError::Cancelled) => return GenerationOutcome::Cancelled,
        Err(PollError::Timeout { attempts, .. }) => {
            return GenerationOutcome::Failed(GenerationFailure::TimedOut { attempts });
        }
    };

    let audio = match result.audio_payload.as_deref().map(decode_audio_payload) {
        Some(Ok(audio)) => audio,
        Some(Err(err)) => {
            story_warn!("Job {} returned an unusable payload: {}", job.id, err);
            return GenerationOutcome::Failed(GenerationFailure::InvalidPayload(err.to_string()));
        }
        None => {
            return GenerationOutcome::Failed(GenerationFailure::InvalidPayload(
                "missing audio payload".to_string(),
            ));
        }
    };

    GenerationOutcome::Ready(ReadyMedia {
        video_url: match kind {
            MediaKind::Video => result.media_url,
            MediaKind::Audio => None,
        },
        audio,
    })
}
