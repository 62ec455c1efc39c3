// ============================================
// src/main.rs
// ============================================

use std::fs::OpenOptions;
use std::io::{Result as IoResult, stdout};
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

mod children;
mod config;
mod deck;
mod error;
mod expander;
mod input;
mod questions;
mod save_data;
mod shorter;
mod speech;
mod ui;

use children::ChildrenTrainer;
use config::{Catechism, Cli, Config};
use expander::{BibleApi, ReferenceExpander};
use input::{SwipeTracker, children_action, flashcard_action, learning_action};
use questions::QuestionBank;
use save_data::SaveStore;
use shorter::{Mode, ShorterTrainer};
use speech::{CommandSpeaker, NoopSpeaker, Speaker};

use clap::Parser;
use crossterm::{
    ExecutableCommand,
    cursor::{Hide, Show},
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// The trainer picked on the command line.
enum App {
    Children(ChildrenTrainer),
    Shorter(ShorterTrainer),
}

impl App {
    fn draw(&self, f: &mut Frame) {
        match self {
            App::Children(trainer) => ui::draw_children(f, trainer, Instant::now()),
            App::Shorter(trainer) => ui::draw_shorter(f, trainer),
        }
    }

    /// Handle one key press. Returns `false` when the user asked to quit.
    fn on_key(&mut self, key: &KeyEvent) -> bool {
        match self {
            App::Children(trainer) => {
                if trainer.handle_form_key(key) {
                    return true;
                }
                match children_action(key) {
                    Some(action) => trainer.apply(action),
                    None => true,
                }
            }
            App::Shorter(trainer) => {
                if trainer.handle_form_key(key) || trainer.handle_search_key(key) {
                    return true;
                }
                let action = match trainer.mode() {
                    Mode::Flashcard => flashcard_action(key),
                    Mode::Learning => learning_action(key),
                };
                match action {
                    Some(action) => trainer.apply(action),
                    None => true,
                }
            }
        }
    }

    fn on_swipe(&mut self, action: input::Action) {
        match self {
            App::Children(trainer) => {
                trainer.apply(action);
            }
            App::Shorter(trainer) if trainer.mode() == Mode::Flashcard => {
                trainer.apply(action);
            }
            App::Shorter(_) => {}
        }
    }

    /// Background work that finished since the last frame.
    fn tick(&mut self) {
        if let App::Shorter(trainer) = self {
            trainer.poll();
        }
    }

    fn shutdown(&mut self) {
        match self {
            App::Children(trainer) => trainer.stop_speech(),
            App::Shorter(trainer) => trainer.stop_speech(),
        }
    }
}

// --------------------------------------------------
// main
// --------------------------------------------------

fn main() -> anyhow::Result<ExitCode> {
    let config = Config::resolve(Cli::parse())?;
    init_logging(&config.state_dir)?;
    info!(catechism = ?config.catechism, data = %config.data_path.display(), "starting");

    let bank = match QuestionBank::load(&config.data_path) {
        Ok(bank) => bank,
        Err(err) => {
            error!(%err, "could not load questions");
            eprintln!(
                "{} {}",
                console::style("Error loading questions.").red().bold(),
                console::style(&err).dim()
            );
            return Ok(ExitCode::FAILURE);
        }
    };

    // Scripture lookups run here while the UI thread keeps drawing.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("scripture-lookup")
        .enable_all()
        .build()?;
    let _guard = runtime.enter();

    let save = SaveStore::open(&config.state_dir);
    let speaker: Box<dyn Speaker> = if config.mute {
        Box::new(NoopSpeaker)
    } else {
        Box::new(CommandSpeaker::new(
            config.tts_command.clone(),
            config.catechism.voice(),
        ))
    };

    let mut app = match config.catechism {
        Catechism::Children => App::Children(ChildrenTrainer::new(bank, save, speaker)),
        Catechism::Shorter => {
            let source = Arc::new(BibleApi::new(&config.scripture_api, &config.translation)?);
            let expander = ReferenceExpander::new(source, runtime.handle().clone());
            App::Shorter(ShorterTrainer::new(bank, save, speaker, expander))
        }
    };

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app);
    restore_terminal()?;
    app.shutdown();
    result?;

    info!("bye");
    Ok(ExitCode::SUCCESS)
}

/// Log to a file in the state directory; the terminal belongs to the UI.
fn init_logging(state_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(state_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(state_dir.join("catechism.log"))?;

    let filter = EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "catechism=info".into()));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

fn setup_terminal() -> IoResult<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?; // drag to swipe
    stdout().execute(Hide)?;
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

fn restore_terminal() -> IoResult<()> {
    stdout().execute(Show)?;
    stdout().execute(DisableMouseCapture)?;
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

fn run_app(terminal: &mut Terminal<impl Backend>, app: &mut App) -> IoResult<()> {
    let mut swipe = SwipeTracker::default();

    loop {
        app.tick();
        terminal.draw(|f| app.draw(f))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if !app.on_key(&key) {
                        break;
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some(action) = swipe.on_mouse(&mouse) {
                        app.on_swipe(action);
                    }
                }
                _ => {}
            }
        }
    }

    Ok(())
}
