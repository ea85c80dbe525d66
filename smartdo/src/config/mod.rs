//! Configuration for the `smartdo` CLI.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/smartdo/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error. The parser API key is
//! never read from the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::DEFAULT_TASKS_KEY;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// No data directory was configured and none could be determined.
    #[error("could not determine data directory (set --data-dir or [storage] data_dir)")]
    NoDataDir,
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    parser: ParserFileConfig,
    ui: UiFileConfig,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_dir: Option<PathBuf>,
    key: Option<String>,
}

/// `[parser]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ParserFileConfig {
    model: Option<String>,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
    subtask_depth: Option<usize>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    completed_cap: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Settings for the remote parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Model name, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// Base URL of the generative language API.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Nesting depth of subtasks in the response schema.
    pub subtask_depth: usize,
    /// API key; `None` means parsing is unavailable.
    pub api_key: Option<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(60),
            subtask_depth: 5,
            api_key: None,
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the task list document.
    pub data_dir: PathBuf,
    /// Store key of the task list.
    pub store_key: String,
    /// Parser settings.
    pub parser: ParserConfig,
    /// How many completed tasks the list view shows.
    pub completed_cap: usize,
}

impl AppConfig {
    /// Default number of completed tasks shown.
    pub const DEFAULT_COMPLETED_CAP: usize = 5;

    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// the file cannot be parsed, or no data directory can be determined.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = ParserConfig::default();
        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| file.storage.data_dir.clone())
            .or_else(|| dirs::data_dir().map(|d| d.join("smartdo")))
            .ok_or(ConfigError::NoDataDir)?;

        Ok(Self {
            data_dir,
            store_key: file
                .storage
                .key
                .clone()
                .unwrap_or_else(|| DEFAULT_TASKS_KEY.to_string()),
            parser: ParserConfig {
                model: cli
                    .model
                    .clone()
                    .or_else(|| file.parser.model.clone())
                    .unwrap_or(defaults.model),
                endpoint: file.parser.endpoint.clone().unwrap_or(defaults.endpoint),
                timeout: file
                    .parser
                    .timeout_secs
                    .map_or(defaults.timeout, Duration::from_secs),
                subtask_depth: file
                    .parser
                    .subtask_depth
                    .unwrap_or(defaults.subtask_depth),
                api_key: cli.api_key.clone().filter(|k| !k.trim().is_empty()),
            },
            completed_cap: file
                .ui
                .completed_cap
                .unwrap_or(Self::DEFAULT_COMPLETED_CAP),
        })
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Natural-language to-do list manager")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/smartdo/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the task list.
    #[arg(long, env = "SMARTDO_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// API key for the task parser.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model used by the task parser.
    #[arg(long)]
    pub model: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "SMARTDO_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/smartdo.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// What to do; shows the list when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Describe tasks in plain language and merge them into the list.
    Add {
        /// Instructions, e.g. "dentist tomorrow at 3, finish report by friday".
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Show the list grouped into overdue, today, upcoming and completed.
    List,
    /// Toggle a task's completion.
    Done {
        /// Task id.
        id: String,
    },
    /// Toggle a subtask's completion.
    Subtask {
        /// Owning task id.
        task_id: String,
        /// Subtask id, at any depth.
        subtask_id: String,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        id: String,
    },
    /// Move a task into a bucket, like dragging it on a board.
    Move {
        /// Task id.
        id: String,
        /// Destination: overdue, today, upcoming or completed.
        #[arg(long)]
        to: String,
        /// Drop onto this task instead of the end of the bucket.
        #[arg(long)]
        onto: Option<String>,
    },
    /// Write a dated JSON backup of the list.
    Export {
        /// Target directory (default: current directory).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Replace the list with a JSON backup.
    Import {
        /// Backup file.
        path: PathBuf,
    },
    /// Delete every task.
    Clear,
    /// Print a prompt for formatting notes with another assistant.
    Prompt,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("smartdo").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
