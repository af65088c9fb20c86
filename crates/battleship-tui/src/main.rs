mod app;
mod logging;
mod render;
mod settings;
mod theme;

use app::App;
use battleship_core::{import, SolveStatus, Supervisor, MAX_SIZE, MIN_SIZE};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use serde::Serialize;
use settings::Settings;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

/// Battleship puzzle editor and front end for the external solver
#[derive(Parser, Debug)]
#[command(name = "battleship", version, long_about = None)]
struct Cli {
    /// Solver executable
    #[arg(long, value_name = "PATH", global = true)]
    engine: Option<PathBuf>,
    /// Board size at startup
    #[arg(long, value_parser = parse_size)]
    size: Option<usize>,
    /// Maximum ship length K
    #[arg(long = "max-ship", value_name = "K", value_parser = clap::value_parser!(u32).range(1..))]
    max_ship: Option<u32>,
    /// Cancel a solve after this many seconds
    #[arg(long, value_name = "SECS", global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,
    /// Load a puzzle in engine input format; `I` re-reads it
    #[arg(long, value_name = "FILE")]
    import: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve a puzzle file without opening the editor
    Solve {
        /// Puzzle in engine input format
        file: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_size(s: &str) -> Result<usize, String> {
    let size: usize = s.parse().map_err(|_| format!("`{}` is not a number", s))?;
    if (MIN_SIZE..=MAX_SIZE).contains(&size) {
        Ok(size)
    } else {
        Err(format!("must be between {} and {}", MIN_SIZE, MAX_SIZE))
    }
}

fn main() -> io::Result<ExitCode> {
    let cli = Cli::parse();
    let settings = Settings::load().with_overrides(cli.engine, cli.size, cli.max_ship, cli.timeout);

    if let Some(Command::Solve { file, json }) = cli.command {
        logging::init_stderr();
        return solve_headless(&settings, &file, json);
    }

    let log_path = logging::init_file();
    info!("starting, log file {:?}", log_path);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    // Run the app
    let result = run_app(&mut stdout, App::new(settings, cli.import));

    // Restore terminal
    disable_raw_mode()?;
    execute!(stdout, LeaveAlternateScreen, DisableMouseCapture)?;

    if let Err(e) = result {
        error!("terminal error: {}", e);
        eprintln!("Error: {}", e);
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

fn run_app(stdout: &mut io::Stdout, mut app: App) -> io::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        let tick_rate = app.get_tick_rate();

        // Render
        render::render(stdout, &mut app)?;
        stdout.flush()?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout.min(Duration::from_millis(33)))? {
            match event::read()? {
                Event::Key(key) => {
                    // Handle Ctrl+C
                    if key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c')
                    {
                        break;
                    }

                    match app.handle_key(key) {
                        app::AppAction::Continue => {}
                        app::AppAction::Quit => break,
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        // Tick timers and pick up engine results
        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct SolveOutput {
    status: String,
    solutions: Vec<Vec<Vec<u8>>>,
}

/// Import `file`, run the engine once and print the solutions.
///
/// Exit code 0 when solved, 1 when there is no solution, 2 on any error.
fn solve_headless(settings: &Settings, file: &Path, json: bool) -> io::Result<ExitCode> {
    let text = match fs::read_to_string(file) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("cannot read {}: {}", file.display(), err);
            return Ok(ExitCode::from(2));
        }
    };
    let puzzle = match import(&text) {
        Ok(puzzle) => puzzle,
        Err(err) => {
            eprintln!("{}: {}", file.display(), err);
            return Ok(ExitCode::from(2));
        }
    };

    let mut supervisor = Supervisor::new(settings.engine_config());
    if let Err(err) = supervisor.start_solve(&puzzle) {
        eprintln!("{}", err);
        return Ok(ExitCode::from(2));
    }
    let Some(report) = supervisor.wait() else {
        eprintln!("engine did not report");
        return Ok(ExitCode::from(2));
    };

    let solutions = supervisor.solutions();
    let mut stdout = io::stdout().lock();
    if json {
        let output = SolveOutput {
            status: report.status.to_string(),
            solutions: solutions.iter().map(|s| s.rows()).collect(),
        };
        serde_json::to_writer_pretty(&mut stdout, &output)?;
        writeln!(stdout)?;
    } else {
        eprintln!("{}", report.status);
        for (i, solution) in solutions.iter().enumerate() {
            writeln!(stdout, "--- Solution {} ---", i + 1)?;
            write!(stdout, "{}", solution)?;
        }
    }

    Ok(match report.status {
        SolveStatus::Solved(_) => ExitCode::SUCCESS,
        SolveStatus::NoSolution => ExitCode::from(1),
        SolveStatus::Failed(_) | SolveStatus::Cancelled { .. } => ExitCode::from(2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_size_bounds() {
        assert_eq!(parse_size("10"), Ok(10));
        assert_eq!(parse_size(&MIN_SIZE.to_string()), Ok(MIN_SIZE));
        assert!(parse_size("1").is_err());
        assert!(parse_size("81").is_err());
        assert!(parse_size("ten").is_err());
    }

    #[test]
    fn test_solve_subcommand_flags() {
        let cli = Cli::try_parse_from([
            "battleship",
            "solve",
            "puzzle.txt",
            "--json",
            "--engine",
            "/opt/solver",
            "--timeout",
            "30",
        ])
        .unwrap();
        assert_eq!(cli.engine, Some(PathBuf::from("/opt/solver")));
        assert_eq!(cli.timeout, Some(30));
        match cli.command {
            Some(Command::Solve { file, json }) => {
                assert_eq!(file, PathBuf::from("puzzle.txt"));
                assert!(json);
            }
            None => panic!("expected solve subcommand"),
        }
    }

    #[test]
    fn test_rejects_zero_max_ship() {
        assert!(Cli::try_parse_from(["battleship", "--max-ship", "0"]).is_err());
    }
}
