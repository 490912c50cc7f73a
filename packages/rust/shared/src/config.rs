//! Application configuration for histmerge.
//!
//! User config lives at `~/.histmerge/histmerge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HistmergeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "histmerge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".histmerge";

// ---------------------------------------------------------------------------
// Config structs (matching histmerge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Wiki site settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Run-loop policies.
    #[serde(default)]
    pub run: RunConfig,
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// MediaWiki `api.php` endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bot account username (e.g. `ExampleBot@histmerge`).
    #[serde(default)]
    pub username: String,

    /// Name of the env var holding the bot password (never store the password itself).
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            username: String::new(),
            password_env: default_password_env(),
        }
    }
}

fn default_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".into()
}
fn default_password_env() -> String {
    "HISTMERGE_BOT_PASSWORD".into()
}

/// `[run]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Edit summary used for every save.
    #[serde(default = "default_summary")]
    pub summary: String,

    /// Minimum ms between saves.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// Titles fetched per work-queue request.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            summary: default_summary(),
            rate_limit_ms: default_rate_limit(),
            page_size: default_page_size(),
        }
    }
}

fn default_summary() -> String {
    "Bot: merging redundant talk page banners into the article history template".into()
}
fn default_rate_limit() -> u64 {
    10_000
}
fn default_page_size() -> u32 {
    50
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.histmerge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| HistmergeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.histmerge/histmerge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| HistmergeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| HistmergeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| HistmergeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| HistmergeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| HistmergeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the bot password env var is set and non-empty, and return the password.
pub fn bot_password(config: &AppConfig) -> Result<String> {
    let var_name = &config.site.password_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(HistmergeError::config(format!(
            "bot password not found. Set the {var_name} environment variable \
             to the account's BotPassword."
        ))),
    }
}
