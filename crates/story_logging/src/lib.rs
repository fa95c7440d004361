#![deny(missing_docs)]
//! Log macros for the story crates.
//!
//! Engine and app code logs through `story_*` macros, which forward to the
//! `log` facade. Only the binary installs a logger; tests call
//! [`initialize_for_tests`].

use log::LevelFilter;

/// Environment variable that overrides the level used by [`initialize_for_tests`].
pub const TEST_LOG_ENV: &str = "STORY_TEST_LOG";

/// Trace-level story log line.
#[macro_export]
macro_rules! story_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Debug-level story log line.
#[macro_export]
macro_rules! story_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Info-level story log line.
#[macro_export]
macro_rules! story_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Warn-level story log line.
#[macro_export]
macro_rules! story_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Error-level story log line.
#[macro_export]
macro_rules! story_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Level for test output: `STORY_TEST_LOG` when it parses, else debug in
/// debug builds and info otherwise.
pub fn test_level(configured: Option<&str>) -> LevelFilter {
    configured
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
}

/// Sends log output of a test binary to the terminal.
///
/// Only the first call installs a logger; later calls do nothing.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

    let level = test_level(std::env::var(TEST_LOG_ENV).ok().as_deref());
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);
}

#[cfg(test)]
mod tests {
    use log::LevelFilter;

    use super::test_level;

    #[test]
    fn explicit_level_wins() {
        assert_eq!(test_level(Some("warn")), LevelFilter::Warn);
        assert_eq!(test_level(Some(" TRACE ")), LevelFilter::Trace);
        assert_eq!(test_level(Some("off")), LevelFilter::Off);
    }

    #[test]
    fn unparsable_level_falls_back_to_build_default() {
        let fallback = if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        assert_eq!(test_level(None), fallback);
        assert_eq!(test_level(Some("chatty")), fallback);
    }
}
