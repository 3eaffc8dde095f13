//! Security stages of the request pipeline.
//!
//! # Data Flow
//! ```text
//! decoded request
//!     → sanitize.rs (strip operator keys from body and query)
//!     → headers.rs (protective response headers)
//!     → xss.rs (escape markup in body and query)
//!     → rate_limit.rs (fixed window per client address)
//!     → hpp.rs (collapse repeated query names)
//!     → cors.rs (allow every origin)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a query that cannot be rewritten is rejected with 400
//! - Sanitizing mutates the request in place; handlers never see the raw input

pub mod cors;
pub mod headers;
pub mod hpp;
pub mod rate_limit;
pub mod sanitize;
pub mod xss;

pub use cors::cors_layer;
pub use headers::{build_security_headers, security_headers};
pub use hpp::parameter_pollution;
pub use rate_limit::{rate_limit_middleware, run_sweeper, Decision, RateLimiterState};
pub use sanitize::mongo_sanitize;
pub use xss::xss_clean;
