//! Resource routers.
//!
//! ```text
//! /api/v2/bootcamps → resource::bootcamp_router
//! /api/v2/courses   → resource::resource_router("courses")
//! /api/v2/auth      → auth::auth_router
//! /api/v2/users     → resource::resource_router("users")
//! /api/v2/reviews   → resource::resource_router("reviews")
//! ```

pub mod auth;
pub mod resource;

use axum::Router;

use crate::http::server::AppState;

pub const API_PREFIX: &str = "/api/v2";

/// Mount every router under its prefix.
pub fn mount(state: AppState) -> Router {
    Router::new()
        .nest(&format!("{}/bootcamps", API_PREFIX), resource::bootcamp_router())
        .nest(&format!("{}/courses", API_PREFIX), resource::resource_router("courses"))
        .nest(&format!("{}/auth", API_PREFIX), auth::auth_router())
        .nest(&format!("{}/users", API_PREFIX), resource::resource_router("users"))
        .nest(&format!("{}/reviews", API_PREFIX), resource::resource_router("reviews"))
        .with_state(state)
}
