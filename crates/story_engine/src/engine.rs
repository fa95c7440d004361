use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use story_logging::{story_debug, story_error};
use tokio_util::sync::CancellationToken;

use crate::{
    run_generation, CycleId, EngineEvent, GenerationOutcome, MediaClient, MediaKind, PollSettings,
};

enum EngineCommand {
    Delay {
        cycle: CycleId,
        delay: Duration,
    },
    Generate {
        cycle: CycleId,
        kind: MediaKind,
        prompt: String,
    },
    Cancel {
        cycle: CycleId,
    },
}

/// One cancellation token per live cycle.
#[derive(Clone, Default)]
struct CycleTokens {
    inner: Arc<Mutex<HashMap<CycleId, CancellationToken>>>,
}

impl CycleTokens {
    fn token(&self, cycle: CycleId) -> CancellationToken {
        match self.inner.lock() {
            Ok(mut tokens) => tokens.entry(cycle).or_default().clone(),
            Err(_) => CancellationToken::new(),
        }
    }

    fn finish(&self, cycle: CycleId) {
        if let Ok(mut tokens) = self.inner.lock() {
            tokens.remove(&cycle);
        }
    }

    fn cancel(&self, cycle: CycleId) {
        let removed = self.inner.lock().ok().and_then(|mut tokens| tokens.remove(&cycle));
        if let Some(token) = removed {
            token.cancel();
        }
    }

    fn cancel_all(&self) {
        if let Ok(mut tokens) = self.inner.lock() {
            for (_, token) in tokens.drain() {
                token.cancel();
            }
        }
    }
}

/// Runs delays and generation cycles on a background tokio runtime.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(client: Arc<dyn MediaClient>, poll_settings: PollSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    story_error!("Failed to start engine runtime: {}", err);
                    return;
                }
            };
            let tokens = CycleTokens::default();
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Delay { cycle, delay } => {
                        let token = tokens.token(cycle);
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            tokio::select! {
                                _ = token.cancelled() => {}
                                _ = tokio::time::sleep(delay) => {
                                    let _ = event_tx.send(EngineEvent::DelayElapsed { cycle });
                                }
                            }
                        });
                    }
                    EngineCommand::Generate {
                        cycle,
                        kind,
                        prompt,
                    } => {
                        let token = tokens.token(cycle);
                        let tokens = tokens.clone();
                        let client = client.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let submitted_tx = event_tx.clone();
                            let outcome = run_generation(
                                client.as_ref(),
                                kind,
                                &prompt,
                                poll_settings,
                                &token,
                                move |job| {
                                    let _ = submitted_tx.send(EngineEvent::JobSubmitted {
                                        cycle,
                                        job: job.clone(),
                                    });
                                },
                            )
                            .await;
                            tokens.finish(cycle);

                            let result = match outcome {
                                GenerationOutcome::Ready(media) => Ok(media),
                                GenerationOutcome::Failed(failure) => Err(failure),
                                GenerationOutcome::Cancelled => {
                                    story_debug!("Cycle {} cancelled", cycle);
                                    return;
                                }
                            };
                            let _ = event_tx.send(EngineEvent::GenerationCompleted { cycle, result });
                        });
                    }
                    EngineCommand::Cancel { cycle } => tokens.cancel(cycle),
                }
            }
            tokens.cancel_all();
        });

        Self { cmd_tx, event_rx }
    }

    /// Emits `EngineEvent::DelayElapsed` for `cycle` after `delay`.
    pub fn schedule_delay(&self, cycle: CycleId, delay: Duration) {
        let _ = self.cmd_tx.send(EngineCommand::Delay { cycle, delay });
    }

    pub fn start_generation(&self, cycle: CycleId, kind: MediaKind, prompt: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Generate {
            cycle,
            kind,
            prompt: prompt.into(),
        });
    }

    /// Stops the cycle's pending delay, request and poll timer. Nothing more is emitted for it.
    pub fn cancel(&self, cycle: CycleId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { cycle });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}
