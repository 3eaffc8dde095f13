//! Observability: structured logs and Prometheus metrics.
//!
//! # Data Flow
//! ```text
//! every request
//!     → metrics::track_requests (counter + latency histogram)
//!     → tower_http TraceLayer (debug spans)
//!     → pipeline request logger (Development only)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LoggingError};
pub use metrics::init_metrics;
