use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use story_engine::{MediaElement, MediaEvent, PairId, PlaybackError, StreamKind};
use story_logging::{story_debug, story_info, story_warn};

const WATCH_INTERVAL: Duration = Duration::from_millis(50);

/// An external player invocation such as `mpv --no-video`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    program: String,
    args: Vec<String>,
}

impl PlayerCommand {
    /// Splits `command` on whitespace. Returns `None` for a blank command.
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

/// Plays one target by spawning a player process; exit is reported as an event
/// tagged with the owning pair.
///
/// Every `play` starts a new run. A watcher thread reports the run's exit only
/// while that run is still current, so a paused or released element stays quiet.
pub struct CommandElement {
    stream: StreamKind,
    pair: PairId,
    command: PlayerCommand,
    target: String,
    mute_arg: Option<String>,
    muted: bool,
    events: mpsc::Sender<(PairId, MediaEvent)>,
    child: Arc<Mutex<Option<Child>>>,
    run: Arc<AtomicU64>,
    ended: Arc<AtomicBool>,
}

impl CommandElement {
    pub fn new(
        stream: StreamKind,
        pair: PairId,
        command: PlayerCommand,
        target: impl Into<String>,
        events: mpsc::Sender<(PairId, MediaEvent)>,
    ) -> Self {
        Self {
            stream,
            pair,
            command,
            target: target.into(),
            mute_arg: None,
            muted: false,
            events,
            child: Arc::new(Mutex::new(None)),
            run: Arc::new(AtomicU64::new(0)),
            ended: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Argument appended to the command line while the element is muted.
    pub fn with_mute_arg(mut self, arg: Option<String>) -> Self {
        self.mute_arg = arg;
        self
    }

    fn stop_child(&self) {
        let child = self.child.lock().ok().and_then(|mut slot| slot.take());
        if let Some(mut child) = child {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn spawn_watcher(&self, run: u64) {
        let stream = self.stream;
        let pair = self.pair;
        let child = self.child.clone();
        let current = self.run.clone();
        let ended = self.ended.clone();
        let events = self.events.clone();

        thread::spawn(move || loop {
            thread::sleep(WATCH_INTERVAL);
            if current.load(Ordering::SeqCst) != run {
                return;
            }
            let status = {
                let Ok(mut slot) = child.lock() else { return };
                let Some(process) = slot.as_mut() else { return };
                match process.try_wait() {
                    Ok(Some(status)) => {
                        slot.take();
                        Ok(status)
                    }
                    Ok(None) => continue,
                    Err(err) => Err(err.to_string()),
                }
            };
            if current.load(Ordering::SeqCst) != run {
                return;
            }
            let event = match status {
                Ok(status) if status.success() => {
                    ended.store(true, Ordering::SeqCst);
                    MediaEvent::Ended(stream)
                }
                Ok(status) => MediaEvent::Error {
                    stream,
                    reason: format!("player exited with {status}"),
                },
                Err(reason) => MediaEvent::Error { stream, reason },
            };
            story_debug!("{} player finished: {:?}", stream, event);
            let _ = events.send((pair, event));
            return;
        });
    }
}

impl MediaElement for CommandElement {
    fn play(&mut self) -> Result<(), PlaybackError> {
        self.stop_child();
        let run = self.run.fetch_add(1, Ordering::SeqCst) + 1;
        self.ended.store(false, Ordering::SeqCst);

        let mut command = Command::new(&self.command.program);
        command.args(&self.command.args);
        if self.muted {
            command.args(self.mute_arg.as_deref());
        }
        command
            .arg(&self.target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = command.spawn().map_err(|err| {
            PlaybackError::new(format!(
                "{}: cannot start {}: {}",
                self.stream, self.command.program, err
            ))
        })?;
        story_info!("Started {} player (pid {})", self.stream, child.id());
        if let Ok(mut slot) = self.child.lock() {
            *slot = Some(child);
        }
        self.spawn_watcher(run);
        Ok(())
    }

    fn pause(&mut self) {
        self.run.fetch_add(1, Ordering::SeqCst);
        self.stop_child();
    }

    fn set_muted(&mut self, muted: bool) {
        if muted && self.mute_arg.is_none() {
            story_warn!("No mute argument configured for the {} player", self.stream);
        }
        self.muted = muted;
    }

    fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    fn release(&mut self) {
        self.pause();
    }
}

impl Drop for CommandElement {
    fn drop(&mut self) {
        self.pause();
    }
}

/// Stand-in when no player is configured: reports where the media is and never ends.
pub struct SilentElement {
    stream: StreamKind,
    target: String,
}

impl SilentElement {
    pub fn new(stream: StreamKind, target: impl Into<String>) -> Self {
        Self {
            stream,
            target: target.into(),
        }
    }
}

impl MediaElement for SilentElement {
    fn play(&mut self) -> Result<(), PlaybackError> {
        story_info!("No {} player configured; media at {}", self.stream, self.target);
        Ok(())
    }

    fn pause(&mut self) {}

    fn set_muted(&mut self, _muted: bool) {}

    fn has_ended(&self) -> bool {
        false
    }
}
