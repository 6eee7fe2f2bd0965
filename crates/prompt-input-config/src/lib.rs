use prompt_input_protocol::state::ShellType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_PROMPT_INPUT_CONFIG: &str = "PROMPT_INPUT_CONFIG";

const DEFAULT_TERMINAL_COLS: u16 = 80;
const DEFAULT_TERMINAL_ROWS: u16 = 24;
const DEFAULT_SCROLLBACK_LIMIT: usize = 4_000;
const MAX_SCROLLBACK_LIMIT: usize = 128_000;
const DEFAULT_SCROLLBACK_WINDOW_ROWS: usize = 200;
const DEFAULT_SYNC_MIN_INTERVAL_MS: u64 = 16;
const MAX_SYNC_MIN_INTERVAL_MS: u64 = 1_000;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

impl ConfigError {
    fn configuration(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptInputConfig {
    #[serde(default)]
    pub terminal: TerminalConfigToml,
    #[serde(default)]
    pub sync: SyncConfigToml,
    #[serde(default)]
    pub shell: ShellConfigToml,
    #[serde(default)]
    pub logging: LoggingConfigToml,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerminalConfigToml {
    #[serde(default = "default_terminal_cols")]
    pub cols: u16,
    #[serde(default = "default_terminal_rows")]
    pub rows: u16,
    #[serde(default = "default_scrollback_limit")]
    pub scrollback_limit: usize,
    /// Scrollback rows materialised above the viewport for each pass.
    #[serde(default = "default_scrollback_window_rows")]
    pub scrollback_window_rows: usize,
}

impl Default for TerminalConfigToml {
    fn default() -> Self {
        Self {
            cols: default_terminal_cols(),
            rows: default_terminal_rows(),
            scrollback_limit: default_scrollback_limit(),
            scrollback_window_rows: default_scrollback_window_rows(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfigToml {
    /// Minimum delay between reconciliation passes; `0` runs every pass
    /// on the next scheduling tick.
    #[serde(default = "default_sync_min_interval_ms")]
    pub min_interval_ms: u64,
}

impl Default for SyncConfigToml {
    fn default() -> Self {
        Self {
            min_interval_ms: default_sync_min_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShellConfigToml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_prompt_line: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfigToml {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfigToml {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}

impl PromptInputConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync.min_interval_ms)
    }

    pub fn shell_type(&self) -> Option<ShellType> {
        self.shell.shell_type.as_deref().and_then(ShellType::parse)
    }
}

pub fn load_from_env() -> Result<PromptInputConfig, ConfigError> {
    let path = config_path_from_env()?;
    load_from_path(path)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PromptInputConfig, ConfigError> {
    load_or_create_config(path.as_ref())
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = resolve_home_dir().ok_or_else(|| {
        ConfigError::configuration("Unable to resolve home directory from HOME or USERPROFILE")
    })?;

    Ok(home
        .join(".config")
        .join("prompt-input")
        .join("config.toml"))
}

fn config_path_from_env() -> Result<PathBuf, ConfigError> {
    match std::env::var(ENV_PROMPT_INPUT_CONFIG) {
        Ok(raw) => {
            if raw.trim().is_empty() {
                default_config_path()
            } else {
                Ok(raw.into())
            }
        }
        Err(std::env::VarError::NotPresent) => default_config_path(),
        Err(_) => Err(ConfigError::configuration(
            "PROMPT_INPUT_CONFIG contained invalid UTF-8",
        )),
    }
}

fn resolve_home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("USERPROFILE")
                .ok()
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
}

fn default_terminal_cols() -> u16 {
    DEFAULT_TERMINAL_COLS
}

fn default_terminal_rows() -> u16 {
    DEFAULT_TERMINAL_ROWS
}

fn default_scrollback_limit() -> usize {
    DEFAULT_SCROLLBACK_LIMIT
}

fn default_scrollback_window_rows() -> usize {
    DEFAULT_SCROLLBACK_WINDOW_ROWS
}

fn default_sync_min_interval_ms() -> u64 {
    DEFAULT_SYNC_MIN_INTERVAL_MS
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

fn persist_config(path: &Path, config: &PromptInputConfig) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(config).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to serialize PROMPT_INPUT_CONFIG for {}: {err}",
            path.display()
        ))
    })?;

    std::fs::write(path, rendered.as_bytes()).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to write PROMPT_INPUT_CONFIG to {}: {err}",
            path.display()
        ))
    })
}

fn load_or_create_config(path: &Path) -> Result<PromptInputConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        ConfigError::configuration(format!(
                            "Failed to create parent directory {} for PROMPT_INPUT_CONFIG: {err}",
                            parent.display()
                        ))
                    })?;
                }
            }

            let default_config = PromptInputConfig::default();
            persist_config(path, &default_config)?;
            return Ok(default_config);
        }
        Err(err) => {
            return Err(ConfigError::configuration(format!(
                "Failed to read PROMPT_INPUT_CONFIG from {}: {err}",
                path.display()
            )));
        }
    };

    let mut config: PromptInputConfig = toml::from_str(&raw).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to parse PROMPT_INPUT_CONFIG from {}: {err}",
            path.display()
        ))
    })?;

    if normalize_config(&mut config) {
        persist_config(path, &config)?;
    }

    Ok(config)
}

fn normalize_config(config: &mut PromptInputConfig) -> bool {
    let mut changed = false;

    changed |= normalize_terminal_config(&mut config.terminal);
    changed |= normalize_sync_config(&mut config.sync);
    changed |= normalize_shell_config(&mut config.shell);
    changed |= normalize_non_empty_string(&mut config.logging.filter, default_log_filter());
    changed |= normalize_optional_string(&mut config.logging.file, true);

    changed
}

pub fn normalize_terminal_config(config: &mut TerminalConfigToml) -> bool {
    let mut changed = false;

    if config.cols == 0 {
        config.cols = default_terminal_cols();
        changed = true;
    }
    if config.rows == 0 {
        config.rows = default_terminal_rows();
        changed = true;
    }

    let normalized_scrollback_limit = config.scrollback_limit.clamp(1, MAX_SCROLLBACK_LIMIT);
    if normalized_scrollback_limit != config.scrollback_limit {
        config.scrollback_limit = normalized_scrollback_limit;
        changed = true;
    }

    let normalized_window_rows = config.scrollback_window_rows.min(config.scrollback_limit);
    if normalized_window_rows != config.scrollback_window_rows {
        config.scrollback_window_rows = normalized_window_rows;
        changed = true;
    }

    changed
}

pub fn normalize_sync_config(config: &mut SyncConfigToml) -> bool {
    let normalized = config.min_interval_ms.min(MAX_SYNC_MIN_INTERVAL_MS);
    if normalized != config.min_interval_ms {
        config.min_interval_ms = normalized;
        return true;
    }
    false
}

pub fn normalize_shell_config(config: &mut ShellConfigToml) -> bool {
    let mut changed = false;

    if let Some(raw) = config.shell_type.as_deref() {
        let normalized = ShellType::parse(raw).map(|shell_type| shell_type.as_str().to_owned());
        if normalized.as_deref() != Some(raw) {
            config.shell_type = normalized;
            changed = true;
        }
    }
    // Prompts keep their trailing spaces, they are part of the rendered text.
    changed |= normalize_optional_string(&mut config.continuation_prompt, false);
    changed |= normalize_optional_string(&mut config.last_prompt_line, false);

    changed
}

fn normalize_non_empty_string(value: &mut String, default: String) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        if *value != default {
            *value = default;
            return true;
        }
        return false;
    }

    if trimmed != value {
        *value = trimmed.to_owned();
        return true;
    }
    false
}

fn normalize_optional_string(value: &mut Option<String>, trim: bool) -> bool {
    let Some(current) = value.as_deref() else {
        return false;
    };

    let normalized = if current.trim().is_empty() {
        None
    } else if trim {
        Some(current.trim().to_owned())
    } else {
        Some(current.to_owned())
    };
    if normalized.as_deref() != Some(current) {
        *value = normalized;
        return true;
    }
    false
}
