use crate::stream::{DecodePolicy, StreamSettings};
use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable overriding `api.log_api_url`
pub const API_URL_ENV: &str = "HOPLOG_API_URL";

const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub output: OutputConfig,
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub log_api_url: String,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub format: String, // text, json, raw
    pub timestamps: bool,
    pub colors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    pub decode_policy: DecodePolicy,
    pub channel_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            log_api_url: DEFAULT_API_URL.to_string(),
            connect_timeout_seconds: 10,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            timestamps: true,
            colors: true,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            decode_policy: DecodePolicy::Drop,
            channel_capacity: 256,
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enable" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disable" | "disabled" => Ok(false),
        _ => Err(anyhow!("Invalid boolean value: '{}'. Use 'true' or 'false'", value)),
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_file_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "hoplog", "hoplog")
            .context("Unable to determine project directories")?;

        let config_dir = proj_dirs.config_dir();
        fs::create_dir_all(config_dir).context("Failed to create config directory")?;

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load configuration from a file. A missing file gives defaults, an
    /// unreadable one gives defaults with a warning.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("CONFIG: No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;

        match toml::from_str::<Config>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("CONFIG: Failed to parse {:?}: {}", path, e);
                eprintln!("⚠️  Warning: Failed to parse config file ({}). Using defaults.", e);
                Ok(Self::default())
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Applies environment overrides
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                debug!("CONFIG: {} overrides log api url", API_URL_ENV);
                self.api.log_api_url = url.trim().to_string();
            }
        }
        self
    }

    /// Stream client settings derived from this configuration
    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            log_api_url: self.api.log_api_url.clone(),
            connect_timeout: Duration::from_secs(self.api.connect_timeout_seconds),
            decode_policy: self.stream.decode_policy,
            channel_capacity: self.stream.channel_capacity,
        }
    }

    /// Set any configuration value using dot notation
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api.log_api_url" => {
                let value = value.trim();
                if value.is_empty() || value == "reset" {
                    self.api.log_api_url = DEFAULT_API_URL.to_string();
                } else if !value.starts_with("http://") && !value.starts_with("https://") {
                    return Err(anyhow!("Invalid log api url: '{}'. Must be a valid HTTP/HTTPS URL", value));
                } else {
                    self.api.log_api_url = value.to_string();
                }
            }
            "api.connect_timeout_seconds" => {
                let timeout = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("Invalid timeout: '{}'. Must be a positive integer (seconds)", value))?;
                if timeout == 0 || timeout > 300 {
                    return Err(anyhow!("Connect timeout must be between 1 and 300 seconds (got: {})", timeout));
                }
                self.api.connect_timeout_seconds = timeout;
            }
            "output.format" => match value.to_lowercase().as_str() {
                "text" | "json" | "raw" => self.output.format = value.to_lowercase(),
                _ => return Err(anyhow!("Invalid output format: '{}'. Valid formats: text, json, raw", value)),
            },
            "output.timestamps" => self.output.timestamps = parse_bool(value)?,
            "output.colors" => self.output.colors = parse_bool(value)?,
            "stream.decode_policy" => {
                self.stream.decode_policy = value.parse::<DecodePolicy>().map_err(|e| anyhow!(e))?;
            }
            "stream.channel_capacity" => {
                let capacity = value
                    .parse::<usize>()
                    .map_err(|_| anyhow!("Invalid channel capacity: '{}'. Must be a positive integer", value))?;
                if capacity == 0 {
                    return Err(anyhow!("Channel capacity must be at least 1"));
                }
                self.stream.channel_capacity = capacity;
            }
            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: '{}'. Available keys: {}",
                    key,
                    Self::all_keys().join(", ")
                ))
            }
        }

        Ok(())
    }

    pub fn all_keys() -> Vec<&'static str> {
        vec![
            "api.log_api_url",
            "api.connect_timeout_seconds",
            "output.format",
            "output.timestamps",
            "output.colors",
            "stream.decode_policy",
            "stream.channel_capacity",
        ]
    }

    /// Get any configuration value using dot notation
    pub fn get_value(&self, key: &str) -> Result<String> {
        match key {
            "api.log_api_url" => Ok(self.api.log_api_url.clone()),
            "api.connect_timeout_seconds" => Ok(self.api.connect_timeout_seconds.to_string()),
            "output.format" => Ok(self.output.format.clone()),
            "output.timestamps" => Ok(self.output.timestamps.to_string()),
            "output.colors" => Ok(self.output.colors.to_string()),
            "stream.decode_policy" => Ok(self.stream.decode_policy.to_string()),
            "stream.channel_capacity" => Ok(self.stream.channel_capacity.to_string()),
            _ => Err(anyhow!("Configuration key not found: {}", key)),
        }
    }

    /// Display configuration in tabular format. A section name (`api`)
    /// selects its keys, an empty filter shows everything.
    pub fn display(&self, filter: Option<&str>) -> Result<String> {
        let keys: Vec<&str> = Self::all_keys()
            .into_iter()
            .filter(|k| match filter {
                None => true,
                Some(f) => *k == f || k.starts_with(&format!("{}.", f)),
            })
            .collect();

        if keys.is_empty() {
            return Err(anyhow!("Configuration key not found: {}", filter.unwrap_or_default()));
        }

        let mut output = String::new();
        output.push_str("┌─────────────────────────────┬───────────────────────────────────────┐\n");
        output.push_str("│ Setting                     │ Value                                 │\n");
        output.push_str("├─────────────────────────────┼───────────────────────────────────────┤\n");

        for key in keys {
            let value = self.get_value(key)?;
            let display_value = if value.chars().count() > 37 {
                format!("{}...", value.chars().take(34).collect::<String>())
            } else {
                value
            };
            output.push_str(&format!("│ {:<27} │ {:<37} │\n", key, display_value));
        }

        output.push_str("└─────────────────────────────┴───────────────────────────────────────┘\n");
        Ok(output)
    }
}
