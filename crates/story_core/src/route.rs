use std::fmt;

use url::Url;

use crate::GenerationKind;

const ROUTE_BASE: &str = "http://localhost/";
const CHAT_PATH: &str = "/chat";

/// Explicit configuration for one conversation view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewConfig {
    kind: GenerationKind,
    initial_story: Option<String>,
}

impl ViewConfig {
    pub fn new(kind: GenerationKind) -> Self {
        Self {
            kind,
            initial_story: None,
        }
    }

    pub fn with_initial_story(mut self, story: impl Into<String>) -> Self {
        let story = story.into();
        let trimmed = story.trim();
        self.initial_story = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Builds a config from a chat route such as `/chat?type=create&story=...`.
    ///
    /// `type=create` selects video; any other value (or none) selects audio.
    pub fn from_route(route: &str) -> Result<Self, RouteError> {
        let base = Url::parse(ROUTE_BASE).map_err(|err| RouteError::Malformed(err.to_string()))?;
        let url = base
            .join(route.trim())
            .map_err(|err| RouteError::Malformed(err.to_string()))?;

        let path = url.path().trim_end_matches('/');
        if path != CHAT_PATH {
            return Err(RouteError::UnknownPath(url.path().to_string()));
        }

        let mut kind = GenerationKind::Audio;
        let mut story = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "type" => {
                    kind = if value == "create" {
                        GenerationKind::Video
                    } else {
                        GenerationKind::Audio
                    };
                }
                "story" => story = Some(value.into_owned()),
                _ => {}
            }
        }

        let config = Self::new(kind);
        Ok(match story {
            Some(story) => config.with_initial_story(story),
            None => config,
        })
    }

    pub fn kind(&self) -> GenerationKind {
        self.kind
    }

    pub fn initial_story(&self) -> Option<&str> {
        self.initial_story.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    Malformed(String),
    UnknownPath(String),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Malformed(reason) => write!(f, "malformed route: {reason}"),
            RouteError::UnknownPath(path) => write!(f, "unknown route path {path}"),
        }
    }
}

impl std::error::Error for RouteError {}
