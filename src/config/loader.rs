//! Configuration loading from the env file and the process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::schema::{AppConfig, Environment, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Default location of the env file, relative to the working directory.
pub const DEFAULT_ENV_FILE: &str = "./config/config.env";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// The env file exists but could not be read or parsed.
    EnvFile(PathBuf, dotenvy::Error),
    /// A variable is present but its value has the wrong shape.
    InvalidValue { key: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvFile(path, e) => write!(f, "Env file {}: {}", path.display(), e),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value for {}: {:?}", key, value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Flat name → value mapping that configuration is parsed from.
///
/// Values from the process environment take precedence over the env file, the
/// same way dotenv never overrides variables that are already set.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: HashMap<String, String>,
}

impl EnvSource {
    /// Collect the env file (if present) overlaid with the process environment.
    pub fn collect(env_file: &Path) -> Result<Self, ConfigError> {
        let mut source = Self::from_env_file(env_file)?;
        source.vars.extend(std::env::vars());
        Ok(source)
    }

    /// Read only the env file. A missing file yields an empty source.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(e) if e.not_found() => {
                tracing::debug!(path = %path.display(), "Env file not found, using process environment only");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::EnvFile(path.to_path_buf(), e)),
        };

        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| ConfigError::EnvFile(path.to_path_buf(), e))?;
            vars.insert(key, value);
        }

        tracing::debug!(path = %path.display(), count = vars.len(), "Env file loaded");
        Ok(Self { vars })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue { key, value: raw.to_string() }),
            None => Ok(None),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl AppConfig {
    /// Build a configuration from a collected source, without validation.
    pub fn from_source(source: &EnvSource) -> Result<Self, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(mode) = source.get("NODE_ENV") {
            config.environment = Environment::new(mode);
        }

        if let Some(host) = source.get("HOST") {
            config.server.host = host.to_string();
        }
        if let Some(port) = source.parse::<u16>("PORT")? {
            config.server.port = port;
        }

        config.database.uri = source.get("MONGO_URI").map(str::to_string);
        if let Some(name) = source.get("MONGO_DB") {
            config.database.name = name.to_string();
        }

        if let Some(root) = source.get("PUBLIC_DIR") {
            config.static_files.root = PathBuf::from(root);
        }

        if let Some(max) = source.parse::<u64>("MAX_FILE_UPLOAD")? {
            config.uploads.max_file_size = max;
        }

        if let Some(max) = source.parse::<u32>("RATE_LIMIT_MAX")? {
            config.rate_limit.max_requests = max;
        }
        if let Some(secs) = source.parse::<u64>("RATE_LIMIT_WINDOW_SECS")? {
            config.rate_limit.window_secs = secs;
        }

        if let Some(filter) = source.get("RUST_LOG") {
            config.observability.log_filter = filter.to_string();
        }
        config.observability.log_format = match source.get("LOG_FORMAT") {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };
        config.observability.metrics_address = source.get("METRICS_ADDRESS").map(str::to_string);

        Ok(config)
    }
}

/// Load and validate configuration from the env file and process environment.
pub fn load_config(env_file: &Path) -> Result<AppConfig, ConfigError> {
    let source = EnvSource::collect(env_file)?;
    let config = AppConfig::from_source(&source)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
