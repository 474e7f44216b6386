use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default server URL
const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Environment variable overriding the server URL
pub const SERVER_URL_ENV: &str = "STRUCTURED_CHAT_API_URL";

/// Directory name under the platform config dir
const APP_DIR: &str = "structured-chat";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Client configuration wrapper.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
}

impl Default for Config {
    fn default() -> Self {
        let app = AppConfig {
            server_url: std::env::var(SERVER_URL_ENV).ok(),
            ..AppConfig::default()
        };
        Self { app }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        let app = builder.build()?;
        Ok(Self { app })
    }

    /// Load `config.toml` from the platform config dir (if present), then
    /// apply the environment override on top.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match default_config_file() {
            Some(path) if path.exists() => Self::read_file(&path)?,
            _ => AppConfig::default(),
        };
        let env = AppConfig {
            server_url: std::env::var(SERVER_URL_ENV).ok(),
            ..AppConfig::default()
        };
        let app = file.merge(env);
        app.validate()?;
        Ok(Self { app })
    }

    /// Load configuration from an explicit TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            app: Self::read_file(path)?,
        })
    }

    fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        AppConfig::from_toml_str(&source)
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url().trim_end_matches('/'), path)
    }

    pub fn server_url(&self) -> &str {
        self.app.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.app.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn history_limit(&self) -> usize {
        self.app.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT)
    }

    /// Preferences file, falling back to the platform config dir
    pub fn preferences_path(&self) -> Option<PathBuf> {
        self.app
            .preferences_path
            .clone()
            .or_else(|| dirs::config_dir().map(|dir| dir.join(APP_DIR).join("preferences.toml")))
    }
}

fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}
