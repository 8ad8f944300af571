use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};
use std::{error::Error, fs, io, sync::Arc, sync::Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod actions;
mod app;
mod config;
mod error;
mod input;
mod integrations;
mod models;
mod runtime;
mod session;
mod sync;
#[cfg(test)]
mod test_helpers;
mod ui;

use app::App;
use config::Config;
use integrations::backend::{HttpBackend, TaskApi};
use session::RedirectParams;

const LOG_FILE_NAME: &str = "todoterm.log";

fn main() -> Result<(), Box<dyn Error>> {
    let (config, warnings) = Config::load();
    if let Err(err) = init_tracing(&config) {
        eprintln!("Logging disabled: {err}");
    }
    for warning in &warnings {
        warn!("{warning}");
    }

    let api: Arc<dyn TaskApi> = Arc::new(HttpBackend::new(&config.backend.base_url)?);
    info!(backend = %config.backend.base_url, "starting todoterm");

    let entry = std::env::args().nth(1).map(|url| RedirectParams::from_url(&url));

    let mut app = App::new(config, api);
    if let Some(params) = entry {
        actions::accept_redirect(&mut app, params);
    }

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    // Not every terminal supports enhancement flags; failure is harmless.
    let _ = execute!(
        stdout,
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
    );

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    let _ = execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags);
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(%err, "terminal loop failed");
        println!("{err:?}");
    }
    info!("exiting");

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        runtime::tick(app);

        terminal.draw(|f| ui::ui(f, app))?;

        if event::poll(std::time::Duration::from_millis(250))? {
            let event = event::read()?;
            input::handle_event(app, event);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Logs go to a file under the data dir; the terminal belongs to the UI.
fn init_tracing(config: &Config) -> Result<(), Box<dyn Error>> {
    let log_dir = config.data.log_dir();
    fs::create_dir_all(&log_dir)?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE_NAME))?;

    let filter = EnvFilter::try_from_env("TODOTERM_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| -> Box<dyn Error> { err })?;

    Ok(())
}
