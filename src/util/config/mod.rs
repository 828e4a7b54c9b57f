//! Hookline configuration system
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Explicit --config file, or user-level (~/.config/hookline/config.toml)
//! 3. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use hookline::util::config::{load_user_config, UserConfig};
//!
//! // Missing file means defaults
//! let config = load_user_config().unwrap_or_default();
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::console::DEFAULT_BLOCK_KEYWORDS;
use crate::lang::DEFAULT_MAX_LOOP_ITERATIONS;

/// User-level configuration for Hookline
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UserConfig {
    /// Console settings
    #[serde(default)]
    pub console: ConsoleConfig,
    /// Hook pipeline settings
    #[serde(default)]
    pub hooks: HooksConfig,
    /// Structured editor settings
    #[serde(default)]
    pub editor: EditorConfig,
    /// Reference engine settings
    #[serde(default)]
    pub engine: EngineConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Console configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsoleConfig {
    /// Prompt string
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Banner printed once at start-up
    #[serde(default = "default_intro")]
    pub intro: String,
}

fn default_prompt() -> String {
    ">>> ".to_string()
}

fn default_intro() -> String {
    format!(
        "Hookline {} - Ctrl-D to quit, type a bound name to re-edit it",
        env!("CARGO_PKG_VERSION")
    )
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            intro: default_intro(),
        }
    }
}

/// Hook pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HooksConfig {
    /// Route block openers (`while x:`) into the editor
    #[serde(default = "default_true")]
    pub block_opener: bool,
    /// Route bare binding names into the editor
    #[serde(default = "default_true")]
    pub re_edit: bool,
    /// Indent unit for continuation lines and the Tab key
    #[serde(default = "default_indent")]
    pub indent: String,
    /// Keywords that open a block
    #[serde(default = "default_block_keywords")]
    pub block_keywords: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_indent() -> String {
    "    ".to_string()
}

fn default_block_keywords() -> Vec<String> {
    DEFAULT_BLOCK_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            block_opener: true,
            re_edit: true,
            indent: default_indent(),
            block_keywords: default_block_keywords(),
        }
    }
}

/// Structured editor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditorConfig {
    /// Editor command; falls back to `$VISUAL`, `$EDITOR`, then `vi`
    #[serde(default)]
    pub command: Option<String>,
    /// Temporary file suffix (drives the editor's syntax mode)
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

fn default_suffix() -> String {
    ".py".to_string()
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            command: None,
            suffix: default_suffix(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// `while` iteration guard
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: u64,
}

fn default_max_loop_iterations() -> u64 {
    DEFAULT_MAX_LOOP_ITERATIONS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// trace, debug, info, warn or error
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    // Try XDG config directory on Unix
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("hookline"));
    }

    // Fallback to ~/.config/hookline
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("hookline"));
    }

    // On Windows, try %APPDATA%
    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join("hookline"));
    }

    None
}

/// Get the user config file path (~/.config/hookline/config.toml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Load user-level configuration
/// Returns default config if file doesn't exist
pub fn load_user_config() -> Result<UserConfig, ConfigError> {
    match get_config_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Ok(UserConfig::default()),
    }
}

/// Load configuration from an explicit file
pub fn load_config_from(path: &Path) -> Result<UserConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::IoError)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<UserConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::ParseError)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Config parse error: {0}")]
    ParseError(toml::de::Error),
}
