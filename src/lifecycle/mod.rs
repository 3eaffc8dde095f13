//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Metrics exporter → Database → Router → Bind → Serve
//!
//! Running (supervisor.rs):
//!     Background task fails or panics → FatalError reported
//!
//! Stop (signals.rs, shutdown.rs):
//!     SIGTERM/SIGINT or FatalError → Close listener → Drain → Stop tasks → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: nothing listens before the database is connected
//! - Crash-only: an unhandled failure stops the process with status 1, an
//!   external supervisor is expected to restart it

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod supervisor;

pub use shutdown::{Shutdown, StopListener};
pub use supervisor::{FatalError, FatalReports, RunOutcome, Supervisor};
