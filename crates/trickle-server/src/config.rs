//! Configuration loading and typed config structures for the Trickle server.
//!
//! Configuration lives in an optional `trickle-config.yaml`. Every field
//! has a default, so a missing file or a partial file is fine. After the
//! file is read, a handful of environment variables override it:
//!
//! - `TRICKLE_HOST` overrides `server.host`
//! - `TRICKLE_PORT` overrides `server.port`
//! - `TRICKLE_DATA_DIR` overrides `data.dir`
//! - `DEBUG` (any non-empty value) sets `logging.level` to `debug`
//!
//! `TRICKLE_CONFIG` selects the file itself; a file named there must exist.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use trickle_corpus::{CorpusFiles, Topic};
use trickle_stream::emitter::DEFAULT_CURSOR_START;
use trickle_stream::hub::DEFAULT_BROADCAST_CAPACITY;
use trickle_stream::{JitterDelay, RegistryConfig, StartPolicy, StreamError};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "trickle-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid {name}: {reason}")]
    Override {
        /// The environment variable.
        name: &'static str,
        /// Why its value was rejected.
        reason: String,
    },

    /// Stream settings are out of range.
    #[error("invalid stream settings: {0}")]
    Stream(#[from] StreamError),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
///
/// Mirrors the structure of `trickle-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrickleConfig {
    /// Listen address.
    #[serde(default)]
    pub server: ServerConfig,

    /// Corpus source files.
    #[serde(default)]
    pub data: DataConfig,

    /// Emitter behavior.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TrickleConfig {
    /// Load configuration the way the binary does.
    ///
    /// Reads the file named by `TRICKLE_CONFIG`, or [`DEFAULT_CONFIG_PATH`].
    /// Environment overrides are applied either way.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or if
    /// an override is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load configuration with variables taken from `lookup`.
    ///
    /// A file named by `TRICKLE_CONFIG` must exist. Only the implicit
    /// [`DEFAULT_CONFIG_PATH`] may be missing, in which case the defaults
    /// are used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if `TRICKLE_CONFIG` names a file that
    /// cannot be read, plus everything [`TrickleConfig::from_file`] returns.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup("TRICKLE_CONFIG") {
            Some(path) => Self::read_file(Path::new(&path))?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::read_file(path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Override`] if an environment override is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Override`] if `TRICKLE_PORT` is not a port.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Override`] if `TRICKLE_PORT` is not a port.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("TRICKLE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TRICKLE_PORT") {
            self.server.port = port.parse().map_err(|e| ConfigError::Override {
                name: "TRICKLE_PORT",
                reason: format!("{port:?}: {e}"),
            })?;
        }
        if let Some(dir) = lookup("TRICKLE_DATA_DIR") {
            self.data.dir = PathBuf::from(dir);
        }
        if lookup("DEBUG").is_some_and(|v| !v.is_empty()) {
            "debug".clone_into(&mut self.logging.level);
        }
        Ok(())
    }
}

/// Listen address for the HTTP + `WebSocket` server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,
    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Where the corpus files live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataConfig {
    /// Directory the file names below are resolved against.
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
    /// Travel updates file.
    #[serde(default = "default_travel_file")]
    pub travel_file: PathBuf,
    /// Business reviews file.
    #[serde(default = "default_reviews_file")]
    pub reviews_file: PathBuf,
    /// GIF metadata file.
    #[serde(default = "default_gifs_file")]
    pub gifs_file: PathBuf,
}

impl DataConfig {
    /// The configured file names as a [`CorpusFiles`].
    pub fn files(&self) -> CorpusFiles {
        CorpusFiles {
            travel: self.travel_file.clone(),
            reviews: self.reviews_file.clone(),
            gifs: self.gifs_file.clone(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            travel_file: default_travel_file(),
            reviews_file: default_reviews_file(),
            gifs_file: default_gifs_file(),
        }
    }
}

/// Emitter cadence and lifecycle settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamConfig {
    /// Index streaming starts from when a client sends no `cursor_start`.
    #[serde(default = "default_cursor_start")]
    pub default_cursor_start: usize,

    /// Mean pause between records, in seconds.
    #[serde(default = "default_interval_mean_secs")]
    pub interval_mean_secs: f64,

    /// Standard deviation of the pause, in seconds.
    #[serde(default = "default_interval_std_dev_secs")]
    pub interval_std_dev_secs: f64,

    /// Whether repeated starts from one client stack or replace.
    #[serde(default)]
    pub start_policy: StartPolicy,

    /// Per-topic broadcast buffer, in events.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl StreamConfig {
    /// Build the registry settings, validating the cadence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Stream`] if the interval parameters are
    /// negative or not finite.
    pub fn registry_config(&self) -> Result<RegistryConfig, ConfigError> {
        Ok(RegistryConfig {
            default_cursor_start: self.default_cursor_start,
            delay: JitterDelay::new(self.interval_mean_secs, self.interval_std_dev_secs)?,
            policy: self.start_policy,
        })
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            default_cursor_start: default_cursor_start(),
            interval_mean_secs: default_interval_mean_secs(),
            interval_std_dev_secs: default_interval_std_dev_secs(),
            start_policy: StartPolicy::default(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins over this.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_travel_file() -> PathBuf {
    PathBuf::from(Topic::Travel.default_file())
}

fn default_reviews_file() -> PathBuf {
    PathBuf::from(Topic::Reviews.default_file())
}

fn default_gifs_file() -> PathBuf {
    PathBuf::from(Topic::Gifs.default_file())
}

const fn default_cursor_start() -> usize {
    DEFAULT_CURSOR_START
}

const fn default_interval_mean_secs() -> f64 {
    JitterDelay::DEFAULT_MEAN_SECS
}

const fn default_interval_std_dev_secs() -> f64 {
    JitterDelay::DEFAULT_STD_DEV_SECS
}

const fn default_broadcast_capacity() -> usize {
    DEFAULT_BROADCAST_CAPACITY
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn default_config_matches_stream_defaults() {
        let config = TrickleConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.stream.default_cursor_start, 5);
        assert_eq!(config.stream.start_policy, StartPolicy::Stack);
        assert_eq!(config.data.files(), CorpusFiles::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8088

data:
  dir: "/srv/trickle"
  travel_file: "tweets.json"
  reviews_file: "reviews.json"
  gifs_file: "gifs.json"

stream:
  default_cursor_start: 0
  interval_mean_secs: 1.5
  interval_std_dev_secs: 0.3
  start_policy: replace
  broadcast_capacity: 64

logging:
  level: "warn"
  format: json
"#;

        let config = TrickleConfig::parse(yaml);
        assert!(config.is_ok(), "parse failed: {config:?}");
        let config = config.unwrap_or_default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.data.dir, PathBuf::from("/srv/trickle"));
        assert_eq!(config.data.files().travel, PathBuf::from("tweets.json"));
        assert_eq!(config.stream.default_cursor_start, 0);
        assert_eq!(config.stream.start_policy, StartPolicy::Replace);
        assert_eq!(config.stream.broadcast_capacity, 64);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = TrickleConfig::parse("server:\n  port: 7000\n").unwrap_or_default();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.stream, StreamConfig::default());
    }

    #[test]
    fn parse_empty_yaml() {
        assert_eq!(TrickleConfig::parse("").ok(), Some(TrickleConfig::default()));
    }

    #[test]
    fn parse_rejects_unknown_policy() {
        let result = TrickleConfig::parse("stream:\n  start_policy: shuffle\n");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn overrides_replace_file_values() {
        let env = vars(&[
            ("TRICKLE_HOST", "127.0.0.1"),
            ("TRICKLE_PORT", "9000"),
            ("TRICKLE_DATA_DIR", "/data"),
            ("DEBUG", "1"),
        ]);
        let mut config = TrickleConfig::default();
        let result = config.apply_overrides(|k| env.get(k).cloned());

        assert!(result.is_ok());
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.data.dir, PathBuf::from("/data"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn empty_debug_flag_is_ignored() {
        let env = vars(&[("DEBUG", "")]);
        let mut config = TrickleConfig::default();
        assert!(config.apply_overrides(|k| env.get(k).cloned()).is_ok());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn bad_port_override_is_an_error() {
        let env = vars(&[("TRICKLE_PORT", "http")]);
        let mut config = TrickleConfig::default();
        let result = config.apply_overrides(|k| env.get(k).cloned());
        assert!(matches!(
            result,
            Err(ConfigError::Override { name: "TRICKLE_PORT", .. })
        ));
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        let env = vars(&[("TRICKLE_CONFIG", missing.to_str().unwrap())]);

        let result = TrickleConfig::load_with(|k| env.get(k).cloned());
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn explicit_config_path_is_read_then_overridden() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trickle.yaml");
        std::fs::write(&path, "server:\n  port: 7000\nstream:\n  start_policy: replace\n").unwrap();
        let env = vars(&[
            ("TRICKLE_CONFIG", path.to_str().unwrap()),
            ("TRICKLE_HOST", "127.0.0.1"),
        ]);

        let config = TrickleConfig::load_with(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.stream.start_policy, StartPolicy::Replace);
    }

    #[test]
    fn registry_config_validates_interval() {
        let mut stream = StreamConfig::default();
        let registry = stream.registry_config();
        assert!(registry.is_ok());
        assert_eq!(
            registry.map(|r| r.default_cursor_start).ok(),
            Some(DEFAULT_CURSOR_START)
        );

        stream.interval_std_dev_secs = -0.5;
        assert!(matches!(
            stream.registry_config(),
            Err(ConfigError::Stream(StreamError::InvalidDelay { .. }))
        ));
    }
}
