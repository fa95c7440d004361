use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use story_logging::{story_debug, story_warn};
use tempfile::TempPath;

/// Locator of a locally created playable resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUrl(String);

impl ResourceUrl {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates and revokes locally held media resources.
pub trait ResourceStore: Send + Sync {
    fn create(&self, bytes: &[u8], mime: &str) -> Result<ResourceUrl, ResourceError>;

    /// Revoking an unknown or already revoked locator is a no-op.
    fn revoke(&self, url: &ResourceUrl);
}

/// Materializes each resource as a temp file; revoking deletes it.
pub struct TempFileStore {
    dir: PathBuf,
    files: Mutex<HashMap<ResourceUrl, TempPath>>,
}

impl TempFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn in_system_temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn live_count(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or(0)
    }
}

impl ResourceStore for TempFileStore {
    fn create(&self, bytes: &[u8], mime: &str) -> Result<ResourceUrl, ResourceError> {
        let mut file = tempfile::Builder::new()
            .prefix("story-")
            .suffix(extension_for(mime))
            .tempfile_in(&self.dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        let path = file.into_temp_path();
        let url = ResourceUrl::new(path.display().to_string());
        story_debug!("Created resource {} ({} bytes, {})", url, bytes.len(), mime);
        if let Ok(mut files) = self.files.lock() {
            files.insert(url.clone(), path);
        }
        Ok(url)
    }

    fn revoke(&self, url: &ResourceUrl) {
        let removed = self.files.lock().ok().and_then(|mut files| files.remove(url));
        if let Some(path) = removed {
            if let Err(err) = path.close() {
                story_warn!("Failed to delete resource {}: {}", url, err);
            } else {
                story_debug!("Revoked resource {}", url);
            }
        }
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "audio/mp3" | "audio/mpeg" => ".mp3",
        "audio/wav" | "audio/x-wav" => ".wav",
        "video/mp4" => ".mp4",
        _ => ".bin",
    }
}

/// Owns one resource and revokes it exactly once, on `release` or drop.
pub struct ScopedResource {
    url: ResourceUrl,
    store: Arc<dyn ResourceStore>,
    released: bool,
}

impl ScopedResource {
    pub fn acquire(
        store: Arc<dyn ResourceStore>,
        bytes: &[u8],
        mime: &str,
    ) -> Result<Self, ResourceError> {
        let url = store.create(bytes, mime)?;
        Ok(Self {
            url,
            store,
            released: false,
        })
    }

    pub fn url(&self) -> &ResourceUrl {
        &self.url
    }

    pub fn release(&mut self) {
        if !std::mem::replace(&mut self.released, true) {
            self.store.revoke(&self.url);
        }
    }
}

impl Drop for ScopedResource {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ScopedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedResource")
            .field("url", &self.url)
            .field("released", &self.released)
            .finish()
    }
}
