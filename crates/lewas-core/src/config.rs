//! Service configuration.
//!
//! Configuration is read from an optional YAML file whose sections all
//! have defaults, then selected values are overridden from the
//! environment so deployments can inject secrets without editing the file:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `API_KEY` | `auth.api_key` |
//! | `DATABASE_URL` | `storage.database_url` |
//! | `LEWAS_HOST` | `server.host` |
//! | `LEWAS_PORT` | `server.port` |
//! | `REFERENCE_DATA_DIR` | `reference_data.dir` |
//! | `LOG_FORMAT` | `logging.format` |

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// API key used when none is configured. Only suitable for local testing.
pub const DEFAULT_API_KEY: &str = "test-api-key";

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

    /// An override or field value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// Listen address.
    #[serde(default)]
    pub server: ServerSection,

    /// API key authentication.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Storage backend selection.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Reference table location.
    #[serde(default)]
    pub reference_data: ReferenceDataConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an override cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without consulting the
    /// environment.
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
    /// Returns [`ConfigError::Invalid`] if `LEWAS_PORT` or `LOG_FORMAT`
    /// holds an unusable value.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `LEWAS_PORT` or `LOG_FORMAT`
    /// holds an unusable value.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("API_KEY") {
            self.auth.api_key = val;
        }
        if let Some(val) = lookup("DATABASE_URL") {
            self.storage.database_url = Some(val).filter(|url| !url.trim().is_empty());
        }
        if let Some(val) = lookup("LEWAS_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("LEWAS_PORT") {
            self.server.port = val
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("LEWAS_PORT={val}: {e}")))?;
        }
        if let Some(val) = lookup("REFERENCE_DATA_DIR") {
            self.reference_data.dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("LOG_FORMAT") {
            self.logging.format = match val.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "LOG_FORMAT must be text or json, got {other}"
                    )));
                }
            };
        }
        Ok(())
    }

    /// Whether the API key is still the built-in test key.
    pub fn uses_default_api_key(&self) -> bool {
        self.auth.api_key == DEFAULT_API_KEY
    }
}

/// Listen address configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// API key configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
    /// Expected value of the `X-API-Key` header.
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
        }
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// `PostgreSQL` connection string. The in-memory store is used when
    /// absent.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Apply bundled migrations at startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

/// Reference table location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferenceDataConfig {
    /// Directory holding the JSON reference files.
    #[serde(default = "default_reference_dir")]
    pub dir: PathBuf,
}

impl Default for ReferenceDataConfig {
    fn default() -> Self {
        Self {
            dir: default_reference_dir(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
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
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8000
}

fn default_api_key() -> String {
    DEFAULT_API_KEY.to_owned()
}

const fn default_max_connections() -> u32 {
    10
}

fn default_reference_dir() -> PathBuf {
    PathBuf::from("reference_data")
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert!(config.uses_default_api_key());
        assert!(config.storage.database_url.is_none());
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9000

auth:
  api_key: "s3cret"

storage:
  database_url: "postgresql://lewas:lewas@db:5432/lewas"
  max_connections: 4
  run_migrations: false

reference_data:
  dir: "/etc/lewas/reference"

logging:
  format: json
  level: "debug"
"#;

        let config = ServiceConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.api_key, "s3cret");
        assert_eq!(config.storage.max_connections, 4);
        assert!(!config.storage.run_migrations);
        assert_eq!(config.reference_data.dir, PathBuf::from("/etc/lewas/reference"));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = ServiceConfig::parse("server:\n  port: 7\n")
            .ok()
            .unwrap_or_default();
        assert_eq!(config.server.port, 7);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.storage.run_migrations);
    }

    #[test]
    fn parse_empty_yaml() {
        assert_eq!(ServiceConfig::parse("").ok(), Some(ServiceConfig::default()));
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = [
            ("API_KEY", "from-env"),
            ("DATABASE_URL", "postgresql://x@y/z"),
            ("LEWAS_PORT", "8123"),
            ("LOG_FORMAT", "JSON"),
        ]
        .into_iter()
        .collect();

        let mut config = ServiceConfig::default();
        let applied = config.apply_overrides(|k| vars.get(k).map(|v| (*v).to_owned()));

        assert!(applied.is_ok());
        assert_eq!(config.auth.api_key, "from-env");
        assert_eq!(config.storage.database_url.as_deref(), Some("postgresql://x@y/z"));
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.uses_default_api_key());
    }

    #[test]
    fn empty_database_url_selects_memory_store() {
        let mut config = ServiceConfig::default();
        let _ = config.apply_overrides(|k| (k == "DATABASE_URL").then(String::new));
        assert!(config.storage.database_url.is_none());
    }

    #[test]
    fn bad_overrides_are_rejected() {
        let mut config = ServiceConfig::default();
        let port = config.apply_overrides(|k| (k == "LEWAS_PORT").then(|| "eighty".to_owned()));
        assert!(matches!(port, Err(ConfigError::Invalid(_))));

        let format = config.apply_overrides(|k| (k == "LOG_FORMAT").then(|| "xml".to_owned()));
        assert!(matches!(format, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("lewas-config.yaml");
        if path.exists() {
            let config = ServiceConfig::parse(&std::fs::read_to_string(&path).unwrap_or_default());
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
