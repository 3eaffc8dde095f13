//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config/config.env + process environment
//!     → loader.rs (collect into EnvSource, parse typed fields)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → passed explicitly to the database connector, pipeline and listener
//! ```
//!
//! # Design Decisions
//! - Config is built once at startup and never mutated
//! - The process environment is read exactly once, in `EnvSource::collect`
//! - Every field except the database URI has a default

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, EnvSource, DEFAULT_ENV_FILE};
pub use schema::AppConfig;
pub use schema::DatabaseConfig;
pub use schema::Environment;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::RateLimitConfig;
