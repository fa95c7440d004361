use std::fmt;

use chrono::{DateTime, Utc};

pub type CycleId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// Opaque server-side job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One accepted generation request. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    pub id: JobId,
    pub submitted_at: DateTime<Utc>,
    pub kind: MediaKind,
}

impl GenerationJob {
    pub fn new(id: JobId, kind: MediaKind) -> Self {
        Self {
            id,
            submitted_at: Utc::now(),
            kind,
        }
    }
}

/// Poll response. Missing fields mean "not ready yet".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationResult {
    pub media_url: Option<String>,
    /// Base64 as received on the wire.
    pub audio_payload: Option<String>,
}

impl GenerationResult {
    pub fn is_ready(&self, kind: MediaKind) -> bool {
        let has_audio = present(self.audio_payload.as_deref());
        match kind {
            MediaKind::Video => has_audio && present(self.media_url.as_deref()),
            MediaKind::Audio => has_audio,
        }
    }
}

fn present(field: Option<&str>) -> bool {
    field.is_some_and(|value| !value.trim().is_empty())
}

/// A ready result with its audio decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyMedia {
    pub video_url: Option<String>,
    pub audio: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationFailure {
    Request(String),
    TimedOut { attempts: u32 },
    InvalidPayload(String),
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationFailure::Request(reason) => write!(f, "request failed: {reason}"),
            GenerationFailure::TimedOut { attempts } => {
                write!(f, "timed out after {attempts} attempts")
            }
            GenerationFailure::InvalidPayload(reason) => write!(f, "invalid payload: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    DelayElapsed {
        cycle: CycleId,
    },
    JobSubmitted {
        cycle: CycleId,
        job: GenerationJob,
    },
    GenerationCompleted {
        cycle: CycleId,
        result: Result<ReadyMedia, GenerationFailure>,
    },
}
