use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use story_core::{update, ConversationState, GenerationKind, Msg};
use story_engine::{EngineHandle, ReqwestMediaClient, ResourceStore, TempFileStore};
use story_logging::story_info;

use super::config;
use super::effects::{EffectRunner, Players};
use super::logging;
use super::player::PlayerCommand;
use super::render::TerminalRenderer;

const TICK: Duration = Duration::from_millis(75);
const QUIT_COMMAND: &str = "/quit";

pub fn run_app() -> anyhow::Result<()> {
    let config = config::load()?;
    logging::initialize(&config.log);
    story_info!(
        "story_app starting: backend={} kind={}",
        config.client.base_url,
        config.view.kind().label()
    );

    let client =
        ReqwestMediaClient::new(config.client.clone()).context("building the media client")?;
    let engine = EngineHandle::new(Arc::new(client), config.poll);
    let store: Arc<dyn ResourceStore> = Arc::new(TempFileStore::in_system_temp());
    let players = Players {
        video: config.video_player.as_deref().and_then(PlayerCommand::parse),
        audio: config.audio_player.as_deref().and_then(PlayerCommand::parse),
        video_mute_arg: config.video_mute_arg.clone(),
    };

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    spawn_input_reader(msg_tx);

    let mut app = App {
        state: ConversationState::new(config.view),
        renderer: TerminalRenderer::new(),
        runner: EffectRunner::new(engine, store, players),
    };

    let mut stdout = io::stdout();
    writeln!(
        stdout,
        "Tell me a story to {}. Press Enter to send, {} to leave.",
        match app.state.kind() {
            GenerationKind::Video => "animate",
            GenerationKind::Audio => "narrate",
        },
        QUIT_COMMAND
    )?;

    app.dispatch(Msg::ViewOpened);
    loop {
        match msg_rx.recv_timeout(TICK) {
            Ok(msg) => app.dispatch(msg),
            Err(RecvTimeoutError::Timeout) => app.dispatch(Msg::Tick),
            Err(RecvTimeoutError::Disconnected) => app.dispatch(Msg::ViewClosed),
        }
        let pending = app.runner.drain();
        for msg in pending {
            app.dispatch(msg);
        }
        app.render(&mut stdout)?;

        if app.state.is_closed() {
            break;
        }
    }

    story_info!("story_app exiting");
    Ok(())
}

struct App {
    state: ConversationState,
    renderer: TerminalRenderer,
    runner: EffectRunner,
}

impl App {
    /// Applies `msg` and any messages its effects produce synchronously.
    fn dispatch(&mut self, msg: Msg) {
        let mut queue = VecDeque::from([msg]);
        while let Some(msg) = queue.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            queue.extend(self.runner.enqueue(effects));
        }
    }

    fn render(&mut self, out: &mut impl Write) -> io::Result<()> {
        if !self.state.consume_dirty() {
            return Ok(());
        }
        let view = self.state.view();
        for line in self.renderer.render(&view) {
            writeln!(out, "{line}")?;
        }
        out.flush()
    }
}

/// Each stdin line is one prompt; EOF or `/quit` closes the view.
fn spawn_input_reader(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim() == QUIT_COMMAND {
                break;
            }
            if msg_tx.send(Msg::InputChanged(line)).is_err()
                || msg_tx.send(Msg::PromptSubmitted).is_err()
            {
                return;
            }
        }
        let _ = msg_tx.send(Msg::ViewClosed);
    });
}
