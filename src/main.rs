use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::info;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;

use tablog::app::AppState;
use tablog::config::Config;
use tablog::sync::{self, DEFAULT_EVENT_BUFFER, SyncCommand, SyncEvent};
use tablog::{input, ui};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let files: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if files.is_empty() {
        eprintln!("Usage: tablog <file> [file...]");
        std::process::exit(1);
    }

    init_logging()?;
    info!("application started with {} file(s)", files.len());

    // Load config
    let config = Config::load();

    // Initialize state
    let mut state = AppState::new(&config, &files);

    // Start the refresh scheduler and countdown ticker
    let (event_tx, mut event_rx) = mpsc::channel(DEFAULT_EVENT_BUFFER);
    let commands = sync::spawn(files, config.refresh_interval(), event_tx);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic);
    }));

    // Main event loop
    let result = run_event_loop(&mut terminal, &mut state, &mut event_rx, &commands).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;

    result
}

/// Log to a file: the TUI owns the terminal, so stderr is not an option.
fn init_logging() -> Result<()> {
    let file = std::fs::File::create("tablog.log")?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

async fn run_event_loop<'a>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState<'a>,
    event_rx: &mut mpsc::Receiver<SyncEvent>,
    commands: &mpsc::Sender<SyncCommand>,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|frame| {
            ui::draw(frame, state);
        })?;

        // Calculate page size for scrolling
        let page_size = terminal.size()?.height.saturating_sub(4) as usize;

        // Use tokio::select! to handle both terminal events and sync events
        tokio::select! {
            // Check for terminal input events
            _ = tokio::time::sleep(Duration::from_millis(16)) => {
                // Poll for events with no blocking
                if event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) => {
                            // Only handle key press events (not release)
                            if key.kind == KeyEventKind::Press {
                                input::handle_key(state, key, page_size);
                            }
                        }
                        Event::Mouse(mouse) => {
                            input::handle_mouse(state, mouse, page_size);
                        }
                        _ => {}
                    }
                }
            }

            // Fold in refresh results, progress, and countdown ticks
            Some(event) = event_rx.recv() => {
                state.handle_sync_event(event);
            }
        }

        // Forward any commands the key handlers queued for the scheduler
        for command in state.pending_commands.drain(..) {
            commands.send(command).await?;
        }

        // Check if we should quit
        if state.should_quit {
            break;
        }
    }

    Ok(())
}
