//! Configuration system (layered: defaults > TOML file > env).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConductorError, Result};

const DEFAULT_CHANNEL_CAPACITY: usize = 64;
const DEFAULT_STREAM_IDLE_TIMEOUT_MS: u64 = 120_000;

/// Runtime settings for the chat pipeline.
///
/// Resolution order (later wins):
/// 1. [`Default`]
/// 2. TOML file passed to [`ConductorConfig::load`]
/// 3. `CONDUCTOR_*` environment variables (a `.env` file is honoured)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductorConfig {
    /// Timezone used for instruction dates when the owner has none.
    pub default_timezone: String,
    /// Most recent history items fed into a run; `None` feeds everything.
    pub history_limit: Option<usize>,
    /// Bound of the per-turn stream channel.
    pub channel_capacity: usize,
    /// Silence on the raw feed longer than this fails the turn. `0` disables.
    pub stream_idle_timeout_ms: u64,
    /// Persist partial assistant text when a run fails mid-stream.
    pub persist_partial_on_error: bool,
    /// Root directory for the file-backed conversation store.
    pub data_dir: PathBuf,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            default_timezone: "UTC".to_string(),
            history_limit: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            stream_idle_timeout_ms: DEFAULT_STREAM_IDLE_TIMEOUT_MS,
            persist_partial_on_error: true,
            data_dir: default_data_dir(),
        }
    }
}

impl ConductorConfig {
    /// Read a TOML file on top of the defaults. Missing keys keep their default.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw).map_err(|e| {
            ConductorError::Configuration(format!("{}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// All layers: defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `CONDUCTOR_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(tz) = lookup("CONDUCTOR_DEFAULT_TIMEZONE") {
            self.default_timezone = tz;
        }
        if let Some(raw) = lookup("CONDUCTOR_HISTORY_LIMIT") {
            self.history_limit = match raw.trim() {
                "" | "none" | "all" => None,
                value => Some(parse_var("CONDUCTOR_HISTORY_LIMIT", value)?),
            };
        }
        if let Some(raw) = lookup("CONDUCTOR_CHANNEL_CAPACITY") {
            self.channel_capacity = parse_var("CONDUCTOR_CHANNEL_CAPACITY", &raw)?;
        }
        if let Some(raw) = lookup("CONDUCTOR_STREAM_IDLE_TIMEOUT_MS") {
            self.stream_idle_timeout_ms = parse_var("CONDUCTOR_STREAM_IDLE_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("CONDUCTOR_PERSIST_PARTIAL") {
            self.persist_partial_on_error = parse_bool("CONDUCTOR_PERSIST_PARTIAL", &raw)?;
        }
        if let Some(dir) = lookup("CONDUCTOR_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(ConductorError::Configuration(
                "channel_capacity must be at least 1".into(),
            ));
        }
        if self.default_timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ConductorError::Configuration(format!(
                "unknown default_timezone '{}'",
                self.default_timezone
            )));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ConductorError::Configuration(format!("{name}: invalid value '{raw}'")))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConductorError::Configuration(format!(
            "{name}: invalid boolean '{raw}'"
        ))),
    }
}

fn default_data_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".conductor"))
        .unwrap_or_else(|| PathBuf::from(".conductor"))
}
