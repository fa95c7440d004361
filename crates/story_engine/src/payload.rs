use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Container the backend uses for generated narration.
pub const AUDIO_MIME: &str = "audio/mp3";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("audio payload is empty")]
    Empty,
    #[error("invalid base64 audio payload: {0}")]
    InvalidBase64(String),
}

/// Decodes a base64 audio payload, accepting an optional `data:<mime>;base64,` prefix
/// and line-wrapped input.
pub fn decode_audio_payload(payload: &str) -> Result<Vec<u8>, PayloadError> {
    let trimmed = payload.trim();
    let data = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(";base64,")
            .map(|(_, data)| data)
            .ok_or_else(|| PayloadError::InvalidBase64("data url is not base64".to_string()))?,
        None => trimmed,
    };

    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(PayloadError::Empty);
    }

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| PayloadError::InvalidBase64(err.to_string()))?;
    if bytes.is_empty() {
        return Err(PayloadError::Empty);
    }
    Ok(bytes)
}
