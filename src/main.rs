// retrace: replay a recorded debug trace in a full-screen terminal UI

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use retrace::runtime::DEFAULT_TRACE_PATH;
use retrace::trace;
use retrace::ui::app::MIN_WIDTH;
use retrace::ui::App;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 2 {
        let program_name = args.first().map(|s| s.as_str()).unwrap_or("retrace");
        eprintln!("Usage: {} [trace-path]", program_name);
        eprintln!();
        eprintln!("With no argument, opens {} in the working directory.", DEFAULT_TRACE_PATH);
        return ExitCode::FAILURE;
    }

    let path = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TRACE_PATH));

    let events = trace::load(&path);
    if events.is_empty() {
        eprintln!("retrace: no events in '{}' (missing or empty trace)", path.display());
        return ExitCode::FAILURE;
    }

    match crossterm::terminal::size() {
        Ok((width, _)) if width >= MIN_WIDTH => {}
        Ok((width, _)) => {
            eprintln!(
                "retrace: terminal is {} columns wide, need at least {}",
                width, MIN_WIDTH
            );
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("retrace: cannot query terminal size: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let mut app = App::new(events);
    let result = run_tui(&mut app);

    if let Err(e) = result {
        eprintln!("retrace: terminal error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Enter the alternate screen, run the app, and restore the terminal on
/// every way out.
fn run_tui(app: &mut App) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal);

    // Restore unconditionally before reporting the app's outcome
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen, Show);

    result
}
