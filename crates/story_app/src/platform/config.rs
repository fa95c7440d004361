use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use story_core::ViewConfig;
use story_engine::{ClientSettings, PollSettings};

use log::LevelFilter;

use super::logging::{LogDestination, LogSettings, DEFAULT_LOG_FILE};

/// Terminal client for story video and narration generation.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the generation backend
    #[arg(long, env = "STORY_API_BASE_URL", default_value = "http://localhost:8000")]
    pub api_base_url: String,

    /// Chat route selecting the generation kind and an optional initial story
    #[arg(long, env = "STORY_ROUTE", default_value = "/chat?type=create")]
    pub route: String,

    /// Knowledge collection id sent with every request
    #[arg(long, env = "STORY_RAG_ID", default_value = "1")]
    pub rag_id: String,

    /// Delay between result fetches, in milliseconds
    #[arg(long, env = "STORY_POLL_INTERVAL_MS", default_value = "2000")]
    pub poll_interval_ms: u64,

    /// Give up on a job after this many milliseconds
    #[arg(long, env = "STORY_POLL_TIMEOUT_MS", default_value = "300000")]
    pub poll_timeout_ms: u64,

    /// Command that plays a video URL, e.g. "mpv --no-audio"
    #[arg(long, env = "STORY_VIDEO_PLAYER")]
    pub video_player: Option<String>,

    /// Argument that silences the video player's own soundtrack
    #[arg(long, env = "STORY_VIDEO_MUTE_ARG", default_value = "--no-audio")]
    pub video_mute_arg: String,

    /// Command that plays an audio file, e.g. "ffplay -nodisp -autoexit"
    #[arg(long, env = "STORY_AUDIO_PLAYER")]
    pub audio_player: Option<String>,

    /// Where log output goes
    #[arg(long, env = "STORY_LOG", value_enum, default_value = "file")]
    pub log: LogDestination,

    /// Most verbose level written: off, error, warn, info, debug or trace
    #[arg(long, env = "STORY_LOG_LEVEL", default_value = "info", value_parser = parse_level)]
    pub log_level: LevelFilter,

    /// Log file used by the file destinations
    #[arg(long, env = "STORY_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,
}

/// Everything the app needs, resolved from flags and environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientSettings,
    pub poll: PollSettings,
    pub view: ViewConfig,
    pub video_player: Option<String>,
    pub audio_player: Option<String>,
    pub video_mute_arg: Option<String>,
    pub log: LogSettings,
}

impl Cli {
    pub fn into_config(self) -> anyhow::Result<AppConfig> {
        let view = ViewConfig::from_route(&self.route)
            .with_context(|| format!("invalid route {:?}", self.route))?;
        if self.poll_interval_ms == 0 {
            anyhow::bail!("--poll-interval-ms must be greater than zero");
        }

        Ok(AppConfig {
            client: ClientSettings {
                base_url: self.api_base_url,
                rag_id: self.rag_id,
                ..ClientSettings::default()
            },
            poll: PollSettings {
                interval: Duration::from_millis(self.poll_interval_ms),
                timeout: Duration::from_millis(self.poll_timeout_ms),
            },
            view,
            video_player: non_blank(self.video_player),
            audio_player: non_blank(self.audio_player),
            video_mute_arg: non_blank(Some(self.video_mute_arg)),
            log: LogSettings {
                destination: self.log,
                level: self.log_level,
                file: self.log_file,
            },
        })
    }
}

/// Loads `.env` when present, then parses flags with env fallbacks.
pub fn load() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();
    Cli::parse().into_config()
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse()
        .map_err(|_| format!("unknown log level {value:?}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use story_core::GenerationKind;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["story_app"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid args")
    }

    #[test]
    fn route_selects_kind_and_initial_story() {
        let config = parse(&["--route", "/chat?type=listen&story=A%20fox"])
            .into_config()
            .expect("config");
        assert_eq!(config.view.kind(), GenerationKind::Audio);
        assert_eq!(config.view.initial_story(), Some("A fox"));
    }

    #[test]
    fn poll_flags_become_poll_settings() {
        let config = parse(&[
            "--route",
            "/chat?type=create",
            "--poll-interval-ms",
            "500",
            "--poll-timeout-ms",
            "1500",
        ])
        .into_config()
        .expect("config");
        assert_eq!(config.poll.interval, Duration::from_millis(500));
        assert_eq!(config.poll.max_attempts(), 3);
    }

    #[test]
    fn unknown_route_is_rejected() {
        let err = parse(&["--route", "/settings"]).into_config().unwrap_err();
        assert!(err.to_string().contains("/settings"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = parse(&["--route", "/chat", "--poll-interval-ms", "0"]).into_config();
        assert!(result.is_err());
    }

    #[test]
    fn blank_player_commands_are_ignored() {
        let config = parse(&["--route", "/chat", "--audio-player", "  "])
            .into_config()
            .expect("config");
        assert_eq!(config.audio_player, None);
    }

    #[test]
    fn log_destination_parses() {
        let cli = parse(&["--log", "both"]);
        assert_eq!(cli.log, LogDestination::Both);
    }

    #[test]
    fn log_flags_become_log_settings() {
        let config = parse(&[
            "--route",
            "/chat",
            "--log",
            "terminal",
            "--log-level",
            "debug",
            "--log-file",
            "/tmp/story-run.log",
        ])
        .into_config()
        .expect("config");
        assert_eq!(
            config.log,
            LogSettings {
                destination: LogDestination::Terminal,
                level: LevelFilter::Debug,
                file: PathBuf::from("/tmp/story-run.log"),
            }
        );

        let defaults = parse(&["--route", "/chat"]).into_config().expect("config");
        assert_eq!(defaults.log, LogSettings::default());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        assert!(Cli::try_parse_from(["story_app", "--log-level", "chatty"]).is_err());
    }
}
