//! Story engine: media client, generation polling, and playback plumbing.
mod client;
mod engine;
mod generate;
mod payload;
mod playback;
mod poll;
mod resource;
mod types;

pub use client::{ClientError, ClientSettings, MediaClient, ReqwestMediaClient};
pub use engine::EngineHandle;
pub use generate::{run_generation, GenerationOutcome};
pub use payload::{decode_audio_payload, PayloadError, AUDIO_MIME};
pub use playback::{
    MediaElement, MediaEvent, PairId, PlaybackError, PlaybackPair, PlaybackSynchronizer,
    StreamKind,
};
pub use poll::{poll, PollError, PollSettings};
pub use resource::{ResourceError, ResourceStore, ResourceUrl, ScopedResource, TempFileStore};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    CycleId, EngineEvent, GenerationFailure, GenerationJob, GenerationResult, JobId, MediaKind,
    ReadyMedia,
};
