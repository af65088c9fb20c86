use env_logger::{Builder, Env, Target};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

/// Environment variable holding the log filter, e.g. `BATTLESHIP_LOG=debug`
pub const LOG_ENV: &str = "BATTLESHIP_LOG";

/// Log to a file under the platform data directory.
///
/// The terminal is in raw mode while the editor runs, so nothing may go to
/// stderr. Returns the log file path, or `None` if logging could not be set up.
pub fn init_file() -> Option<PathBuf> {
    let dir = dirs::data_local_dir()?.join("battleship");
    fs::create_dir_all(&dir).ok()?;
    let path = dir.join("battleship.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .ok()?;

    Builder::from_env(Env::default().filter_or(LOG_ENV, "info"))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .ok()?;
    Some(path)
}

/// Log to stderr, for headless runs
pub fn init_stderr() {
    let _ = Builder::from_env(Env::default().filter_or(LOG_ENV, "warn"))
        .target(Target::Stderr)
        .try_init();
}
