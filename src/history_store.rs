#[cfg(test)]
use std::cell::{Cell, RefCell};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::rc::Rc;

use serde::Deserialize;

use crate::error::StorageError;
use crate::line::Line;

/// Number of lines kept in the history file.
pub const HISTORY_CAP: usize = 500;

pub const INITIALIZED_MESSAGE: &str = "Terminal initialized. Type \"/help\" for a list of commands.";

pub const DEFAULT_CONFIG_TOML: &str = r#"[server]
url = "ws://localhost:5000/ws"
auto_connect = false

[storage]
history_file = "~/.multichat/history.json"

[scroll]
tolerance_rows = 1
debounce_ms = 200

[transport]
max_reconnect_attempts = 5
base_delay_ms = 1000
max_delay_ms = 30000

[display]
highlight_words = []
"#;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub scroll: ScrollConfig,
    pub transport: TransportConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub auto_connect: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:5000/ws".to_string(),
            auto_connect: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub history_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_file: "~/.multichat/history.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrollConfig {
    pub tolerance_rows: u16,
    pub debounce_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            tolerance_rows: 1,
            debounce_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    pub max_reconnect_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub highlight_words: Vec<String>,
}

/// Reads the client config, writing the default file first when it is
/// missing. `path` overrides `~/.multichat/config.toml`.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, StorageError> {
    let config_file = match path {
        Some(path) => path.to_path_buf(),
        None => home_dir()?.join(".multichat").join("config.toml"),
    };
    if !config_file.exists() {
        if let Some(parent) = config_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_file, DEFAULT_CONFIG_TOML)?;
    }
    let text = fs::read_to_string(&config_file)?;
    Ok(toml::from_str::<ClientConfig>(&text)?)
}

pub fn expand_home(raw_path: &str) -> Result<PathBuf, StorageError> {
    if raw_path == "~" {
        return home_dir();
    }
    if let Some(rest) = raw_path.strip_prefix("~/") {
        return Ok(home_dir()?.join(rest));
    }
    Ok(PathBuf::from(raw_path))
}

fn home_dir() -> Result<PathBuf, StorageError> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or(StorageError::NoHome)
}

/// Durable store of the full line history. Failures never reach the caller:
/// loading falls back to the default history and a failed save is logged.
pub trait LineHistory: fmt::Debug {
    fn load(&self) -> Vec<Line>;
    fn save(&mut self, lines: &[Line]);
}

/// The stored subset of `lines`: session-only lines dropped, render-only
/// content replaced by placeholders, bounded to the newest [`HISTORY_CAP`].
/// Walks from the newest line so only the kept tail is converted.
pub fn persistable(lines: &[Line]) -> Vec<Line> {
    let mut stored = lines
        .iter()
        .rev()
        .filter_map(Line::storage_form)
        .take(HISTORY_CAP)
        .collect::<Vec<_>>();
    stored.reverse();
    stored
}

pub fn default_history() -> Vec<Line> {
    vec![Line::system(INITIALIZED_MESSAGE)]
}

#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Ok(Self::new(expand_home(&config.history_file)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no history has been written yet.
    pub fn read(&self) -> Result<Option<Vec<Line>>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    pub fn write(&self, lines: &[Line]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string(&persistable(lines))?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

impl LineHistory for HistoryFile {
    fn load(&self) -> Vec<Line> {
        match self.read() {
            Ok(Some(lines)) if !lines.is_empty() => lines,
            Ok(_) => default_history(),
            Err(err) => {
                tracing::error!(path = %self.path.display(), %err, "failed to load history");
                default_history()
            }
        }
    }

    fn save(&mut self, lines: &[Line]) {
        if let Err(err) = self.write(lines) {
            tracing::error!(path = %self.path.display(), %err, "failed to save history");
        }
    }
}

/// History kept in memory only, applying the same storage rules as the file.
/// Clones share the same backing record.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    stored: Rc<RefCell<Option<Vec<Line>>>>,
    saves: Rc<Cell<usize>>,
}

#[cfg(test)]
impl MemoryHistory {
    pub fn with_lines(lines: Vec<Line>) -> Self {
        Self {
            stored: Rc::new(RefCell::new(Some(lines))),
            saves: Rc::default(),
        }
    }

    pub fn stored(&self) -> Option<Vec<Line>> {
        self.stored.borrow().clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.get()
    }
}

#[cfg(test)]
impl LineHistory for MemoryHistory {
    fn load(&self) -> Vec<Line> {
        match self.stored.borrow().as_ref() {
            Some(lines) if !lines.is_empty() => lines.clone(),
            _ => default_history(),
        }
    }

    fn save(&mut self, lines: &[Line]) {
        *self.stored.borrow_mut() = Some(persistable(lines));
        self.saves.set(self.saves.get() + 1);
    }
}

#[cfg(test)]
#[path = "../tests/unit/history_store_tests.rs"]
mod tests;
