use std::{
    io::{self, stdin, Stdout},
    path::PathBuf,
};

use anyhow::Result;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};

use reso::{
    app::App,
    app_dirs::AppDirs,
    audio::GongCue,
    logging,
    preferences::{FilePreferenceStore, MAX_DURATION_MINUTES},
    presentation::TerminalPresentation,
    runtime::{AppEvent, CrosstermEventSource, Runner},
    schedule::SystemClock,
    session::{Cues, SessionController},
    ui,
};

/// calm terminal meditation timer
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A calm meditation timer: pick a duration, hear a gong at the start and the end, watch a progress dial or let the screen go black."
)]
pub struct Cli {
    /// session length in minutes (at most one day), remembered as the new default
    #[clap(short = 'd', long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_DURATION_MINUTES)))]
    duration: Option<u32>,

    /// preference file to use instead of the default one
    #[clap(long)]
    prefs: Option<PathBuf>,

    /// log file (filter with RESO_LOG, e.g. RESO_LOG=debug)
    #[clap(long)]
    log: Option<PathBuf>,
}

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self> {
        enable_raw_mode()?;

        let mut out = io::stdout();
        if let Err(err) = execute!(out, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err.into());
        }

        let terminal = match Terminal::new(CrosstermBackend::new(out)) {
            Ok(t) => t,
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                return Err(err.into());
            }
        };

        Ok(Self { terminal })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

fn build_app(cli: &Cli) -> App {
    let store = match &cli.prefs {
        Some(path) => FilePreferenceStore::with_path(path),
        None => FilePreferenceStore::new(),
    };
    info!(path = %store.path().display(), "using preference file");

    let mut session = SessionController::new(
        Box::new(store),
        Box::new(TerminalPresentation::new()),
        Cues {
            start: Box::new(GongCue::new("start")),
            finish: Box::new(GongCue::new("finish")),
        },
        Box::new(SystemClock),
    );
    if let Some(minutes) = cli.duration {
        session.set_duration_minutes(minutes);
    }
    App::new(session)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(path) = cli.log.clone().or_else(AppDirs::log_path) {
        if let Err(e) = logging::init(&path) {
            eprintln!("logging disabled: {e}");
        }
    }

    let mut app = build_app(&cli);
    let result = {
        let mut session = TerminalSession::new()?;
        run_app(&mut session.terminal, &mut app)
    };

    if let Err(err) = &result {
        warn!(error = %err, "exiting after error");
    }
    // Dropping the app releases the wake lock and leaves immersive mode.
    drop(app);
    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let runner = Runner::new(CrosstermEventSource::new());

    while !app.should_quit {
        terminal.draw(|f| ui::draw(app, f))?;

        match runner.step() {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                app.on_key(key);
                app.on_tick();
            }
        }
    }

    Ok(())
}
