//! Request decoding stages of the pipeline.

pub mod body;
pub mod cookies;
pub mod request_log;
pub mod static_files;
pub mod upload;

pub use body::{decode_json_body, JSON_BODY_LIMIT};
pub use cookies::decode_cookies;
pub use request_log::{log_requests, REQUEST_LOG_TARGET};
pub use static_files::{serve_static, StaticFiles};
pub use upload::{handle_uploads, UploadLimits};
