use serde::{Deserialize, Serialize};

use std::future::Future;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SignetError};

/// Largest image file accepted for inline embedding, in bytes (500 KB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 512_000;

/// Width in pixels given to embedded images when the host reports none.
pub const DEFAULT_CONTAINER_WIDTH: u32 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the admin API, without a trailing slash.
    pub api_base_url: String,
    /// Bearer token sent with every request.
    pub api_token: Option<String>,
    /// Largest image file accepted for embedding.
    pub max_image_bytes: u64,
    /// Pixel width applied to embedded images.
    pub container_width: u32,
    pub request_timeout_secs: u64,
    /// Console log level, overridden by `RUST_LOG`.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_owned(),
            api_token: None,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            container_width: DEFAULT_CONTAINER_WIDTH,
            request_timeout_secs: 30,
            log_level: "info".to_owned(),
        }
    }
}

impl Config {
    /// Load config from environment variables.
    ///
    /// - `SIGNET_API_BASE_URL`
    /// - `SIGNET_API_TOKEN`
    /// - `SIGNET_MAX_IMAGE_BYTES`
    /// - `SIGNET_CONTAINER_WIDTH`
    /// - `SIGNET_REQUEST_TIMEOUT_SECS`
    /// - `SIGNET_LOG_LEVEL`
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(url) = lookup("SIGNET_API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(token) = lookup("SIGNET_API_TOKEN").filter(|t| !t.is_empty()) {
            config.api_token = Some(token);
        }
        if let Some(raw) = lookup("SIGNET_MAX_IMAGE_BYTES") {
            config.max_image_bytes = parse_number("SIGNET_MAX_IMAGE_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("SIGNET_CONTAINER_WIDTH") {
            config.container_width = parse_number("SIGNET_CONTAINER_WIDTH", &raw)?;
        }
        if let Some(raw) = lookup("SIGNET_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_number("SIGNET_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(level) = lookup("SIGNET_LOG_LEVEL") {
            config.log_level = level;
        }
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self> {
        let config = loader.load().await?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration using the provided saver.
    pub async fn save(&self, saver: &impl Saver) -> Result<()> {
        saver.save(self).await
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.api_base_url.is_empty() {
            return Err(SignetError::config("api_base_url is empty"));
        }
        if self.max_image_bytes == 0 {
            return Err(SignetError::config("max_image_bytes must be positive"));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| SignetError::config(format!("{key} is not a number: {raw:?}")))
}

/// The trait for loading configuration data.
pub trait Loader {
    /// Loads the configuration data.
    fn load(&self) -> impl Future<Output = Result<Config>> + Send;
}

/// The trait for saving configuration data.
pub trait Saver {
    /// Saves the configuration data.
    fn save(&self, config: &Config) -> impl Future<Output = Result<()>> + Send;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a configuration file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a new [`FileStore`] with the given path.
    ///
    /// Only `.json` files are supported.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn check_extension(&self) -> Result<()> {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(()),
            _ => Err(SignetError::config(format!(
                "unsupported config file format: {}",
                self.path.display()
            ))),
        }
    }
}

impl Loader for FileStore {
    async fn load(&self) -> Result<Config> {
        self.check_extension()?;
        Ok(serde_json::from_str(&std::fs::read_to_string(&self.path)?)?)
    }
}

impl Saver for FileStore {
    async fn save(&self, config: &Config) -> Result<()> {
        self.check_extension()?;
        Ok(std::fs::write(
            &self.path,
            serde_json::to_string_pretty(config)?,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_image_bytes, 512_000);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SIGNET_API_BASE_URL", "https://admin.example.com/api/"),
            ("SIGNET_API_TOKEN", "t0k"),
            ("SIGNET_CONTAINER_WIDTH", "480"),
            ("SIGNET_REQUEST_TIMEOUT_SECS", " 5 "),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://admin.example.com/api");
        assert_eq!(config.api_token.as_deref(), Some("t0k"));
        assert_eq!(config.container_width, 480);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_bad_number_is_config_error() {
        let err = Config::from_lookup(lookup(&[("SIGNET_MAX_IMAGE_BYTES", "lots")])).unwrap_err();
        assert!(matches!(err, SignetError::Config(_)));

        let err = Config::from_lookup(lookup(&[("SIGNET_MAX_IMAGE_BYTES", "0")])).unwrap_err();
        assert!(matches!(err, SignetError::Config(_)));
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let path = std::env::temp_dir().join(format!("signet-config-{}.json", std::process::id()));
        let store = FileStore::new(&path);
        let config = Config {
            api_token: Some("abc".into()),
            container_width: 320,
            ..Config::default()
        };
        config.save(&store).await.unwrap();
        let loaded = Config::load(&store).await.unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_file_store_rejects_other_formats() {
        let store = FileStore::new("config.toml");
        assert!(matches!(
            Config::load(&store).await,
            Err(SignetError::Config(_))
        ));
    }
}
