use crate::error::{Pop3Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub pop3: Pop3Config,
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Name announced in the greeting; the OS host name when unset
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Pop3Config {
    pub listen_addr: String,
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub maildir_path: String,
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

fn default_max_line_length() -> usize {
    1024
}

fn default_command_timeout_secs() -> u64 {
    600 // RFC 1939 autologout timer: at least 10 minutes
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Pop3Error::Config(e.to_string()))?;

        Self::from_toml(&content)
    }

    /// Load `path` if given, else `./config.toml` when present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| Pop3Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        // Must at least fit "QUIT\r\n"
        if self.pop3.max_line_length < 6 {
            return Err(Pop3Error::Config(format!(
                "pop3.max_line_length too small: {}",
                self.pop3.max_line_length
            )));
        }
        if self.pop3.command_timeout_secs == 0 {
            return Err(Pop3Error::Config(
                "pop3.command_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.pop3.command_timeout_secs)
    }

    /// Host name used in the greeting banner
    pub fn hostname(&self) -> String {
        match &self.server.hostname {
            Some(name) if !name.is_empty() => name.clone(),
            _ => gethostname::gethostname().to_string_lossy().to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            pop3: Pop3Config {
                listen_addr: "0.0.0.0:1110".to_string(),
                max_line_length: default_max_line_length(),
                command_timeout_secs: default_command_timeout_secs(),
            },
            storage: StorageConfig {
                maildir_path: "/tmp/maildir".to_string(),
                database_url: "sqlite://users.db".to_string(),
            },
            logging: LoggingConfig::default(),
        }
    }
}
