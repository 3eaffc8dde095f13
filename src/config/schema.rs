//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API server.
//! Every section has a `Default` so a minimal environment still yields a usable
//! config; only the database URI has no meaningful default.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Serialize, Serializer};
use url::Url;

/// The only `NODE_ENV` value that enables request logging. Matched exactly.
pub const DEVELOPMENT_MODE: &str = "Development";

/// Root configuration for the API server.
#[derive(Debug, Clone, Serialize, Default)]
pub struct AppConfig {
    /// Environment mode taken from `NODE_ENV`.
    pub environment: Environment,

    /// Listener settings.
    pub server: ServerConfig,

    /// Backing document database.
    pub database: DatabaseConfig,

    /// Static asset serving.
    pub static_files: StaticFilesConfig,

    /// Multipart upload decoding.
    pub uploads: UploadConfig,

    /// Fixed-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Environment mode as given by the operator, verbatim.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct Environment(Option<String>);

impl Environment {
    pub fn new(mode: impl Into<String>) -> Self {
        Self(Some(mode.into()))
    }

    /// Mode name for log lines; an unset mode prints as `undefined`.
    pub fn name(&self) -> &str {
        self.0.as_deref().unwrap_or("undefined")
    }

    /// True only for the exact, capitalized `Development` value.
    pub fn is_development(&self) -> bool {
        self.0.as_deref() == Some(DEVELOPMENT_MODE)
    }

    /// True when the mode looks like development but differs in casing,
    /// e.g. `development`. Request logging stays off in that case.
    pub fn is_miscased_development(&self) -> bool {
        match self.0.as_deref() {
            Some(mode) => mode != DEVELOPMENT_MODE && mode.eq_ignore_ascii_case(DEVELOPMENT_MODE),
            None => false,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,
}

impl ServerConfig {
    /// Get the bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseConfig {
    /// Connection string (`mongodb://`, `mongodb+srv://` or `memory://`).
    /// Serialized with its password masked.
    #[serde(serialize_with = "serialize_masked_uri")]
    pub uri: Option<String>,

    /// Database used when the URI does not name one.
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: None,
            name: "devcamper".to_string(),
        }
    }
}

/// Replace the password of a connection string, if it carries one.
pub fn mask_password(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(mut url) if url.password().is_some() => match url.set_password(Some("****")) {
            Ok(()) => url.to_string(),
            Err(()) => "<masked>".to_string(),
        },
        Ok(_) => uri.to_string(),
        Err(_) => "<masked>".to_string(),
    }
}

fn serialize_masked_uri<S: Serializer>(uri: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    uri.as_deref().map(mask_password).serialize(s)
}

/// Static asset configuration.
#[derive(Debug, Clone, Serialize)]
pub struct StaticFilesConfig {
    /// Directory served at the site root.
    pub root: PathBuf,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public"),
        }
    }
}

/// Multipart upload configuration.
#[derive(Debug, Clone, Serialize)]
pub struct UploadConfig {
    /// Maximum size of one uploaded file in bytes.
    pub max_file_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1_000_000,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitConfig {
    /// Requests allowed per client in one window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 10 * 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ObservabilityConfig {
    /// Tracing filter directive used when neither the CLI nor `RUST_LOG` set one.
    pub log_filter: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Prometheus endpoint bind address; metrics export is off when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "bootcamp_api=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_address: None,
        }
    }
}
