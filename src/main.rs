use std::fs::OpenOptions;
use std::io;
use std::sync::mpsc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use trafficscope::api::ApiClient;
use trafficscope::app::App;
use trafficscope::cli::{self, Cli, Commands};
use trafficscope::config::Config;
use trafficscope::network::{Poller, Update};
use trafficscope::ui;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config, cli.base_url)?;
    init_logging(&config)?;

    let client = ApiClient::new(&config.api.base_url, config.api.timeout())?;

    match cli.command {
        None | Some(Commands::Tui) => run_tui(&config, client),
        Some(command) => {
            let mut stdout = io::stdout().lock();
            cli::run(&client, command, &mut stdout).await
        }
    }
}

/// Logs go to a file; the terminal belongs to the dashboard.
fn init_logging(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.log.directory)
        .with_context(|| format!("creating log directory {}", config.log.directory.display()))?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_file())
        .with_context(|| format!("opening {}", config.log_file().display()))?;

    let filter = EnvFilter::try_from_env("TRAFFICSCOPE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_tui(config: &Config, client: ApiClient) -> Result<()> {
    tracing::info!(base_url = %config.api.base_url, "starting dashboard");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    install_panic_hook();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel::<Update>();
    let poller = Poller::new(client, tx);
    let mut app = App::new(config);
    app.start(Instant::now());

    let result = event_loop(&mut terminal, &mut app, &poller, &rx, config);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "dashboard exited with an error");
    }
    result
}

/// Leaves raw mode and the alternate screen before the panic message prints.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
        tracing::error!(%panic_info, "dashboard panicked");
        original_hook(panic_info);
    }));
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    poller: &Poller,
    rx: &mpsc::Receiver<Update>,
    config: &Config,
) -> Result<()> {
    let tick = config.ui.tick();
    terminal.clear()?;
    loop {
        while let Ok(update) = rx.try_recv() {
            app.apply(update);
        }
        for (ticket, job) in app.take_jobs() {
            poller.dispatch(ticket, job);
        }

        app.tick(Instant::now());
        for (ticket, job) in app.take_jobs() {
            poller.dispatch(ticket, job);
        }

        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(tick)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            tracing::info!("quit requested");
            break;
        }
    }
    Ok(())
}
