use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::provider::weatherapi;

pub const DISCORD_TOKEN_ENV: &str = "DISCORD_BOT_TOKEN";
pub const WEATHER_API_KEY_ENV: &str = "WEATHER_API_KEY";
/// Overrides the location of the TOML config file.
pub const CONFIG_PATH_ENV: &str = "WEATHER_BOT_CONFIG";

pub const DEFAULT_PREFIX: &str = "!";
pub const DEFAULT_COMMAND: &str = "weather";
pub const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";
pub const DEFAULT_DISCORD_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Optional on-disk settings.
///
/// Example TOML:
/// prefix = "!"
/// lang = "en"
/// timeout_secs = 10
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub discord_bot_token: Option<String>,
    pub weather_api_key: Option<String>,
    pub prefix: Option<String>,
    pub command: Option<String>,
    pub lang: Option<String>,
    pub timeout_secs: Option<u64>,
    pub weather_api_url: Option<String>,
    pub discord_api_url: Option<String>,
    pub discord_gateway_url: Option<String>,
}

/// Resolved configuration, built once at startup and passed down explicitly.
#[derive(Clone)]
pub struct Config {
    pub discord_bot_token: Option<String>,
    pub weather_api_key: Option<String>,
    pub prefix: String,
    pub command: String,
    pub lang: String,
    pub timeout: Duration,
    pub weather_api_url: String,
    pub discord_api_url: String,
    pub discord_gateway_url: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &Option<String>| s.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("discord_bot_token", &redact(&self.discord_bot_token))
            .field("weather_api_key", &redact(&self.weather_api_key))
            .field("prefix", &self.prefix)
            .field("command", &self.command)
            .field("lang", &self.lang)
            .field("timeout", &self.timeout)
            .field("weather_api_url", &self.weather_api_url)
            .field("discord_api_url", &self.discord_api_url)
            .field("discord_gateway_url", &self.discord_gateway_url)
            .finish()
    }
}

impl Config {
    /// Load the config file (if any) and overlay secrets from the process environment.
    pub fn load() -> Result<Self> {
        let file = Self::load_file()?;
        Ok(Self::from_sources(file, |key| std::env::var(key).ok()))
    }

    /// Merge file settings with an environment lookup. Environment wins for secrets;
    /// empty values count as unset.
    pub fn from_sources(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let secret = |key: &str, fallback: Option<String>| {
            env(key).filter(|v| !v.trim().is_empty()).or(fallback.filter(|v| !v.trim().is_empty()))
        };

        Self {
            discord_bot_token: secret(DISCORD_TOKEN_ENV, file.discord_bot_token),
            weather_api_key: secret(WEATHER_API_KEY_ENV, file.weather_api_key),
            prefix: file.prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            command: file.command.unwrap_or_else(|| DEFAULT_COMMAND.to_string()),
            lang: file.lang.unwrap_or_else(|| weatherapi::DEFAULT_LANG.to_string()),
            timeout: file
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(weatherapi::DEFAULT_TIMEOUT),
            weather_api_url: file
                .weather_api_url
                .unwrap_or_else(|| weatherapi::DEFAULT_BASE_URL.to_string()),
            discord_api_url: file
                .discord_api_url
                .unwrap_or_else(|| DEFAULT_DISCORD_API_URL.to_string()),
            discord_gateway_url: file
                .discord_gateway_url
                .unwrap_or_else(|| DEFAULT_DISCORD_GATEWAY_URL.to_string()),
        }
    }

    pub fn require_discord_token(&self) -> Result<&str> {
        self.discord_bot_token.as_deref().ok_or_else(|| {
            anyhow!(
                "{DISCORD_TOKEN_ENV} is not set.\n\
                 Hint: export it or put it into a .env file next to the bot."
            )
        })
    }

    pub fn require_weather_api_key(&self) -> Result<&str> {
        self.weather_api_key.as_deref().ok_or_else(|| {
            anyhow!(
                "{WEATHER_API_KEY_ENV} is not set.\n\
                 Hint: get a key at https://www.weatherapi.com and export it or put it into .env."
            )
        })
    }

    /// Read the TOML file, or return empty settings if it doesn't exist.
    ///
    /// A path given explicitly via `WEATHER_BOT_CONFIG` must exist.
    fn load_file() -> Result<FileConfig> {
        let explicit = std::env::var_os(CONFIG_PATH_ENV).is_some();
        let path = Self::config_file_path()?;
        if !path.exists() {
            if explicit {
                return Err(anyhow!("Config file not found: {}", path.display()));
            }
            return Ok(FileConfig::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        parse_file(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let dirs = ProjectDirs::from("dev", "weather-task", "weather-bot")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn parse_file(contents: &str) -> Result<FileConfig> {
    Ok(toml::from_str(contents)?)
}
