//! FeedClaw configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main FeedClaw configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedClawConfig {
    /// Text state locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Model service configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Discord channel configuration
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Periodic run configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Note layout configuration
    #[serde(default)]
    pub notes: NotesConfig,
}

impl FeedClawConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from an explicit path, else the default location if it exists,
    /// else built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }
}

/// Default config file location (`<config_dir>/feedclaw/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join("feedclaw").join("config.toml"))
}

/// Locations of the plain text state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// User interest file (read-only)
    pub interest_file: PathBuf,

    /// User profile file (append-only)
    pub profile_file: PathBuf,

    /// Feed source list, one URL per line
    pub feed_sources_file: PathBuf,

    /// Root directory for notes
    pub notes_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            interest_file: PathBuf::from("user.txt"),
            profile_file: PathBuf::from("user_profile.txt"),
            feed_sources_file: PathBuf::from("RSS_feed_sources.txt"),
            notes_dir: PathBuf::from("Notes"),
        }
    }
}

/// Model service configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// API base URL
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_ref: String,

    /// Model identifier
    pub model: String,

    /// Output token cap for the short summary
    pub short_max_tokens: u32,

    /// Output token cap for the long summary
    pub long_max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    pub max_retries: u32,

    /// Base backoff between retries in milliseconds (doubled each attempt)
    pub retry_backoff_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key_ref: "openrouter_api_key".to_string(),
            model: "anthropic/claude-3.5-haiku-20241022".to_string(),
            short_max_tokens: 200,
            long_max_tokens: 600,
            temperature: 0.7,
            timeout_secs: 60,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

/// Discord channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Environment variable holding the bot token
    pub bot_token_ref: String,

    /// Prefix for DM commands
    pub command_prefix: String,

    /// User that receives scheduled runs and one-shot CLI runs
    pub owner_user_id: Option<String>,

    /// REST API base URL
    pub api_base: String,

    /// Gateway websocket URL
    pub gateway_url: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token_ref: "discord_bot_token".to_string(),
            command_prefix: "!".to_string(),
            owner_user_id: None,
            api_base: "https://discord.com/api/v10".to_string(),
            gateway_url: "wss://gateway.discord.gg/?v=10&encoding=json".to_string(),
        }
    }
}

/// Periodic run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Enable periodic runs for the owner
    pub enabled: bool,

    /// Minutes between runs
    pub interval_minutes: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: 15,
        }
    }
}

/// How note files are laid out under the notes directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoteLayout {
    /// One numbered subfolder per processed feed
    #[default]
    PerFeed,

    /// Every note directly under the notes directory
    Flat,
}

/// Note configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    /// Directory layout
    pub layout: NoteLayout,

    /// Maximum length of a sanitized file or folder name
    pub max_name_len: usize,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            layout: NoteLayout::PerFeed,
            max_name_len: 50,
        }
    }
}

/// Resolve a secret from the environment variable named by `secret_ref`.
///
/// Tries the exact name first, then the UPPER_CASE form
/// (e.g. `"discord_bot_token"` → `$DISCORD_BOT_TOKEN`).
pub fn resolve_secret(secret_ref: &str) -> Option<String> {
    std::env::var(secret_ref)
        .or_else(|_| std::env::var(secret_ref.to_uppercase()))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Like [`resolve_secret`] but fails with a configuration error.
pub fn require_secret(secret_ref: &str) -> Result<String> {
    resolve_secret(secret_ref).ok_or_else(|| {
        Error::Config(format!(
            "Secret not found in environment: {} (or {})",
            secret_ref,
            secret_ref.to_uppercase()
        ))
    })
}
