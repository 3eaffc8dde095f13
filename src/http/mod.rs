//! HTTP handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, metrics and trace layers)
//!     → pipeline.rs (eleven ordered stages)
//!         middleware/ (decoding: body, cookies, logging, static, uploads)
//!         security/   (sanitizing, headers, rate limit, CORS)
//!     → routes/ (resource routers)
//!     → error.rs (terminal error handler, JSON envelope)
//!     → Send to client
//! ```

pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod request;
pub mod server;

pub use error::ApiError;
pub use pipeline::{Stage, PIPELINE};
pub use request::{Payload, RequestBody, RequestCookies, UploadedFiles, Uploads};
pub use server::{App, AppState, HttpServer};
