//! Bootcamp directory API.
//!
//! A JSON REST API for coding bootcamps, their courses, reviews and users.
//!
//! # Architecture Overview
//!
//! ```text
//! config.env + environment ──▶ config ──▶ db::connect ──▶ http::HttpServer
//!
//! request ──▶ metrics/trace ──▶ pipeline (11 stages) ──▶ routes ──▶ error handler
//!
//! lifecycle: supervisor reports unhandled failures ──▶ close listener ──▶ exit 1
//! ```

// Core subsystems
pub mod config;
pub mod db;
pub mod http;
pub mod routes;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{RunOutcome, Shutdown, Supervisor};
