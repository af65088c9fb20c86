use crate::theme::ThemeName;
use battleship_core::{EngineConfig, DEFAULT_MAX_SHIP_LEN, DEFAULT_SIZE, MAX_SIZE, MIN_SIZE};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine executable looked up when nothing else is configured
pub fn default_engine() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("battleship_solver.exe")
    } else {
        PathBuf::from("./battleship_solver")
    }
}

/// User settings, stored as JSON in the platform config directory.
///
/// Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Engine executable
    pub engine: PathBuf,
    /// Board size at startup
    pub size: usize,
    /// Max ship length at startup
    pub max_ship_len: u32,
    /// Cancel solves running longer than this
    pub timeout_secs: Option<u64>,
    /// Color theme
    pub theme: ThemeName,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            size: DEFAULT_SIZE,
            max_ship_len: DEFAULT_MAX_SHIP_LEN,
            timeout_secs: None,
            theme: ThemeName::Dark,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("battleship").join("settings.json"))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) => {
                debug!("no settings at {}: {}", path.display(), err);
                return Self::default();
            }
        };
        match serde_json::from_str::<Settings>(&json) {
            Ok(settings) => settings.sanitized(),
            Err(err) => {
                warn!("ignoring invalid settings {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    /// Save to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::path()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no config directory"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    /// Apply command-line overrides
    pub fn with_overrides(
        mut self,
        engine: Option<PathBuf>,
        size: Option<usize>,
        max_ship_len: Option<u32>,
        timeout_secs: Option<u64>,
    ) -> Self {
        if let Some(engine) = engine {
            self.engine = engine;
        }
        if let Some(size) = size {
            self.size = size;
        }
        if let Some(k) = max_ship_len {
            self.max_ship_len = k;
        }
        if timeout_secs.is_some() {
            self.timeout_secs = timeout_secs;
        }
        self.sanitized()
    }

    fn sanitized(mut self) -> Self {
        self.size = self.size.clamp(MIN_SIZE, MAX_SIZE);
        self.max_ship_len = self.max_ship_len.max(1);
        self.timeout_secs = self.timeout_secs.filter(|secs| *secs > 0);
        self
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(&self.engine).with_timeout(self.timeout_secs.map(Duration::from_secs))
    }
}
