//! Configuration for imagen-batch.
//!
//! Settings come from four places, highest precedence first: command-line
//! flags, environment variables, the config file
//! (`~/.config/imagen-batch/config.toml` or `--config`), and built-in
//! defaults. Everything ends up in a [`ClientConfig`] that is handed to
//! [`crate::imagen::ImagenClient::new`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::imagen::retry::{DEFAULT_STATUS_ATTEMPTS, DEFAULT_TRANSFER_ATTEMPTS};
use crate::imagen::ImagenError;

/// Environment variable holding the API key fallback.
pub const API_KEY_ENV: &str = "IMAGEN_API_KEY";

/// Environment variable overriding the transfer pool size.
pub const MAX_WORKERS_ENV: &str = "MAX_WORKERS";

/// Default base URL for the Imagen API.
pub const DEFAULT_BASE_URL: &str = "https://api-beta.imagen-ai.com/v1";

/// Default number of concurrent file transfers.
pub const DEFAULT_WORKERS: usize = 10;

/// Default pause between status queries (30 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default timeout for a single HTTP request, including signed-link transfers.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything an `ImagenClient` needs. Immutable once the client is built.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    /// Maximum number of file transfers in flight at once.
    pub workers: usize,
    /// Attempts per file upload/download before the batch fails.
    pub transfer_attempts: u32,
    /// Attempts per status query on transient errors.
    pub status_attempts: u32,
    pub poll_interval: Duration,
    /// `None` waits for the remote job indefinitely.
    pub poll_deadline: Option<Duration>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Draw progress bars for bulk transfers.
    pub show_progress: bool,
}

impl ClientConfig {
    /// Defaults for everything except the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            workers: DEFAULT_WORKERS,
            transfer_attempts: DEFAULT_TRANSFER_ATTEMPTS,
            status_attempts: DEFAULT_STATUS_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_deadline: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            show_progress: true,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Combine file settings, command-line overrides and the process
    /// environment.
    pub fn resolve(file: &FileConfig, overrides: Overrides) -> Result<Self, ImagenError> {
        Self::resolve_with_env(file, overrides, |name| std::env::var(name).ok())
    }

    /// Like [`ClientConfig::resolve`], with an injectable environment lookup.
    pub fn resolve_with_env<E>(
        file: &FileConfig,
        overrides: Overrides,
        env: E,
    ) -> Result<Self, ImagenError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let api_key = resolve_api_key(overrides.api_key, env(API_KEY_ENV))
            .or_else(|_| resolve_api_key(file.api.api_key.clone(), None))?;

        let mut config = ClientConfig::new(api_key);

        if let Some(base_url) = &file.api.base_url {
            config.base_url = base_url.clone();
        }

        let env_workers = match env(MAX_WORKERS_ENV) {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                ImagenError::Configuration(format!(
                    "{} must be a positive integer, got '{}'",
                    MAX_WORKERS_ENV, raw
                ))
            })?),
            None => None,
        };
        if let Some(workers) = overrides
            .workers
            .or(env_workers)
            .or(file.transfer.workers)
        {
            if workers == 0 {
                return Err(ImagenError::Configuration(
                    "worker count must be at least 1".to_string(),
                ));
            }
            config.workers = workers;
        }

        if let Some(attempts) = file.transfer.attempts {
            config.transfer_attempts = attempts.max(1);
        }
        if let Some(attempts) = file.polling.status_attempts {
            config.status_attempts = attempts.max(1);
        }
        if let Some(secs) = overrides.poll_interval_secs.or(file.polling.interval_secs) {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.deadline_secs.or(file.polling.deadline_secs) {
            config.poll_deadline = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

/// Pick the first non-blank credential, or fail before anything touches
/// the network.
pub fn resolve_api_key(
    explicit: Option<String>,
    fallback: Option<String>,
) -> Result<String, ImagenError> {
    explicit
        .into_iter()
        .chain(fallback)
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
        .ok_or_else(|| {
            ImagenError::Configuration(format!(
                "API key not configured (use --api-key or set {})",
                API_KEY_ENV
            ))
        })
}

/// Values taken from the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub workers: Option<usize>,
    pub poll_interval_secs: Option<u64>,
    pub deadline_secs: Option<u64>,
}

/// Config file structure.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub transfer: TransferSection,
    #[serde(default)]
    pub polling: PollingSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TransferSection {
    pub workers: Option<usize>,
    pub attempts: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PollingSection {
    pub interval_secs: Option<u64>,
    pub deadline_secs: Option<u64>,
    pub status_attempts: Option<u32>,
}

impl FileConfig {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_path();
        if path.exists() {
            Self::read(&path)
        } else {
            Ok(FileConfig::default())
        }
    }

    /// Load from a path the user asked for explicitly; it must exist.
    pub fn load_from_explicit(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Self::read(path)
    }

    /// Explicit path if given, default location otherwise.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_explicit(path),
            None => Self::load(),
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file '{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl From<ConfigError> for ImagenError {
    fn from(e: ConfigError) -> Self {
        ImagenError::Configuration(e.to_string())
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("imagen-batch").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/imagen-batch/config.toml")
        })
}

/// Contents written by `imagen-batch config init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# imagen-batch configuration

[api]
# base_url = "https://api-beta.imagen-ai.com/v1"
# Prefer the IMAGEN_API_KEY environment variable over storing the key here.
# api_key = ""

[transfer]
# Concurrent uploads/downloads (MAX_WORKERS overrides this)
workers = 10
# Attempts per file before the batch fails
attempts = 3

[polling]
# Seconds between status checks
interval_secs = 30
# Give up after this many seconds; omit to wait indefinitely
# deadline_secs = 7200
# Attempts per status query on transient errors
status_attempts = 5
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::new("key");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.workers, 10);
        assert_eq!(config.transfer_attempts, 3);
        assert_eq!(config.status_attempts, 5);
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert!(config.poll_deadline.is_none());
    }

    #[test]
    fn test_resolve_api_key_prefers_explicit() {
        let key = resolve_api_key(Some("cli".to_string()), Some("file".to_string())).unwrap();
        assert_eq!(key, "cli");
    }

    #[test]
    fn test_resolve_api_key_skips_blank() {
        let key = resolve_api_key(Some("  ".to_string()), Some("file".to_string())).unwrap();
        assert_eq!(key, "file");
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let result = resolve_api_key(None, Some(String::new()));
        assert!(matches!(result, Err(ImagenError::Configuration(_))));
    }

    #[test]
    fn test_resolve_uses_env_key() {
        let config = ClientConfig::resolve_with_env(
            &FileConfig::default(),
            Overrides::default(),
            env_from(&[(API_KEY_ENV, "env-key")]),
        )
        .unwrap();
        assert_eq!(config.api_key, "env-key");
    }

    #[test]
    fn test_resolve_without_any_key_fails() {
        let result = ClientConfig::resolve_with_env(
            &FileConfig::default(),
            Overrides::default(),
            env_from(&[]),
        );
        assert!(matches!(result, Err(ImagenError::Configuration(_))));
    }

    #[test]
    fn test_resolve_workers_precedence() {
        let file: FileConfig = toml::from_str("[transfer]\nworkers = 4\n").unwrap();

        let from_file = ClientConfig::resolve_with_env(
            &file,
            Overrides {
                api_key: Some("k".to_string()),
                ..Default::default()
            },
            env_from(&[]),
        )
        .unwrap();
        assert_eq!(from_file.workers, 4);

        let from_env = ClientConfig::resolve_with_env(
            &file,
            Overrides {
                api_key: Some("k".to_string()),
                ..Default::default()
            },
            env_from(&[(MAX_WORKERS_ENV, "6")]),
        )
        .unwrap();
        assert_eq!(from_env.workers, 6);

        let from_cli = ClientConfig::resolve_with_env(
            &file,
            Overrides {
                api_key: Some("k".to_string()),
                workers: Some(2),
                ..Default::default()
            },
            env_from(&[(MAX_WORKERS_ENV, "6")]),
        )
        .unwrap();
        assert_eq!(from_cli.workers, 2);
    }

    #[test]
    fn test_resolve_rejects_bad_worker_env() {
        let result = ClientConfig::resolve_with_env(
            &FileConfig::default(),
            Overrides {
                api_key: Some("k".to_string()),
                ..Default::default()
            },
            env_from(&[(MAX_WORKERS_ENV, "lots")]),
        );
        assert!(matches!(result, Err(ImagenError::Configuration(_))));
    }

    #[test]
    fn test_resolve_rejects_zero_workers() {
        let result = ClientConfig::resolve_with_env(
            &FileConfig::default(),
            Overrides {
                api_key: Some("k".to_string()),
                workers: Some(0),
                ..Default::default()
            },
            env_from(&[]),
        );
        assert!(matches!(result, Err(ImagenError::Configuration(_))));
    }

    #[test]
    fn test_resolve_polling_settings() {
        let file: FileConfig = toml::from_str(
            r#"
[api]
base_url = "http://localhost:9000/v1"

[polling]
interval_secs = 5
deadline_secs = 600
status_attempts = 2
"#,
        )
        .unwrap();

        let config = ClientConfig::resolve_with_env(
            &file,
            Overrides {
                api_key: Some("k".to_string()),
                poll_interval_secs: Some(1),
                ..Default::default()
            },
            env_from(&[]),
        )
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:9000/v1");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.poll_deadline, Some(Duration::from_secs(600)));
        assert_eq!(config.status_attempts, 2);
    }

    #[test]
    fn test_default_template_parses() {
        let file: FileConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(file.transfer.workers, Some(10));
        assert_eq!(file.transfer.attempts, Some(3));
        assert_eq!(file.polling.interval_secs, Some(30));
        assert!(file.polling.deadline_secs.is_none());
        assert!(file.api.api_key.is_none());
    }

    #[test]
    fn test_load_from_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileConfig::load_from_explicit(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_load_from_explicit_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[transfer\nworkers = ").unwrap();

        let result = FileConfig::load_from_explicit(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = default_path();
        assert!(path.ends_with("imagen-batch/config.toml"));
    }
}
