//! The ordered request pipeline.
//!
//! Stages run in `PIPELINE` order on the way in and in reverse on the way out.
//! A stage that answers a request itself (static assets, rate limiting,
//! decoding failures) keeps every later stage and the routers from seeing it.

use std::fmt;
use std::sync::Arc;

use axum::{http::HeaderMap, middleware, Router};

use crate::config::AppConfig;
use crate::http::middleware::{
    decode_cookies, decode_json_body, handle_uploads, log_requests, serve_static, StaticFiles,
    UploadLimits,
};
use crate::security::{
    build_security_headers, cors_layer, mongo_sanitize, parameter_pollution,
    rate_limit_middleware, security_headers, xss_clean, RateLimiterState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BodyDecoder,
    CookieDecoder,
    RequestLogger,
    StaticFiles,
    FileUpload,
    MongoSanitize,
    SecurityHeaders,
    XssClean,
    RateLimit,
    ParameterPollution,
    Cors,
}

/// Stage order, outermost first.
pub const PIPELINE: [Stage; 11] = [
    Stage::BodyDecoder,
    Stage::CookieDecoder,
    Stage::RequestLogger,
    Stage::StaticFiles,
    Stage::FileUpload,
    Stage::MongoSanitize,
    Stage::SecurityHeaders,
    Stage::XssClean,
    Stage::RateLimit,
    Stage::ParameterPollution,
    Stage::Cors,
];

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::BodyDecoder => "body-decoder",
            Stage::CookieDecoder => "cookie-decoder",
            Stage::RequestLogger => "request-logger",
            Stage::StaticFiles => "static-files",
            Stage::FileUpload => "file-upload",
            Stage::MongoSanitize => "mongo-sanitize",
            Stage::SecurityHeaders => "security-headers",
            Stage::XssClean => "xss-clean",
            Stage::RateLimit => "rate-limit",
            Stage::ParameterPollution => "parameter-pollution",
            Stage::Cors => "cors",
        }
    }

    /// The request logger only runs in `Development` mode; every other stage
    /// always runs.
    pub fn is_enabled(self, config: &AppConfig) -> bool {
        match self {
            Stage::RequestLogger => config.environment.is_development(),
            _ => true,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stages that will run for `config`, in order.
pub fn active_stages(config: &AppConfig) -> Vec<Stage> {
    PIPELINE
        .iter()
        .copied()
        .filter(|stage| stage.is_enabled(config))
        .collect()
}

/// Shared state the stages need, built once at startup.
#[derive(Clone)]
pub struct PipelineDeps {
    pub rate_limiter: Arc<RateLimiterState>,
    pub security_headers: Arc<HeaderMap>,
    pub static_files: StaticFiles,
    pub uploads: UploadLimits,
}

impl PipelineDeps {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            rate_limiter: Arc::new(RateLimiterState::new(&config.rate_limit)),
            security_headers: build_security_headers(),
            static_files: StaticFiles::new(&config.static_files.root),
            uploads: UploadLimits {
                max_file_size: config.uploads.max_file_size,
            },
        }
    }
}

fn layer_stage(routes: Router, stage: Stage, deps: &PipelineDeps) -> Router {
    match stage {
        Stage::BodyDecoder => routes.layer(middleware::from_fn(decode_json_body)),
        Stage::CookieDecoder => routes.layer(middleware::from_fn(decode_cookies)),
        Stage::RequestLogger => routes.layer(middleware::from_fn(log_requests)),
        Stage::StaticFiles => routes.layer(middleware::from_fn_with_state(
            deps.static_files.clone(),
            serve_static,
        )),
        Stage::FileUpload => {
            routes.layer(middleware::from_fn_with_state(deps.uploads, handle_uploads))
        }
        Stage::MongoSanitize => routes.layer(middleware::from_fn(mongo_sanitize)),
        Stage::SecurityHeaders => routes.layer(middleware::from_fn_with_state(
            deps.security_headers.clone(),
            security_headers,
        )),
        Stage::XssClean => routes.layer(middleware::from_fn(xss_clean)),
        Stage::RateLimit => routes.layer(middleware::from_fn_with_state(
            deps.rate_limiter.clone(),
            rate_limit_middleware,
        )),
        Stage::ParameterPollution => routes.layer(middleware::from_fn(parameter_pollution)),
        Stage::Cors => routes.layer(cors_layer()),
    }
}

/// Wrap `routes` in every active stage, first stage outermost.
pub fn apply(routes: Router, config: &AppConfig, deps: &PipelineDeps) -> Router {
    let stages = active_stages(config);
    tracing::debug!(
        stages = ?stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
        "Assembling request pipeline"
    );

    stages
        .into_iter()
        .rev()
        .fold(routes, |routes, stage| layer_stage(routes, stage, deps))
}
