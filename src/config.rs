use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::crypto::SaltMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub port: u16,
    pub database: Database,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub sweeper: Sweeper,
    #[serde(default)]
    pub crypto: Crypto,
}

impl Config {
    /// Read and parse a TOML config file.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&source).context("failed to parse config")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_upload_size: usize,
    pub max_title_length: usize,
    pub max_expiration_hours: Option<u32>,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_upload_size: 1024 * 1024,
            max_title_length: 100,
            max_expiration_hours: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Sweeper {
    pub interval_secs: u64,
    pub grace_secs: u64,
}

impl Sweeper {
    /// The sweep period, never shorter than one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

impl Default for Sweeper {
    fn default() -> Self {
        Sweeper {
            interval_secs: 3600,
            grace_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Crypto {
    pub salt_mode: SaltMode,
}

fn default_max_connections() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            base_url = "http://localhost:8080"
            port = 8080

            [database]
            url = "sqlite::memory:"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.limits.max_title_length, 100);
        assert_eq!(config.limits.max_expiration_hours, None);
        assert_eq!(config.sweeper.interval(), Duration::from_secs(3600));
        assert_eq!(config.sweeper.grace(), Duration::from_secs(300));
        assert_eq!(config.crypto.salt_mode, SaltMode::PerPaste);
    }

    #[test]
    fn fixed_salt_mode_parses() {
        let config: Config = toml::from_str(
            r#"
            base_url = "http://localhost:8080"
            port = 8080

            [database]
            url = "sqlite::memory:"

            [limits]
            max_expiration_hours = 48

            [crypto]
            salt_mode = "fixed"
            "#,
        )
        .unwrap();

        assert_eq!(config.limits.max_expiration_hours, Some(48));
        assert_eq!(config.crypto.salt_mode, SaltMode::Fixed);
    }
}
