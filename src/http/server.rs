//! HTTP server setup.
//!
//! # Responsibilities
//! - Mount the resource routers behind the terminal error handler
//! - Wrap them in the ordered pipeline
//! - Serve on a bound listener until a signal or an unhandled failure
//! - Run and stop the background tasks the pipeline needs

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::Request, middleware, Router, ServiceExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::Layer;
use tower_http::{
    catch_panic::CatchPanicLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::db::DocumentStore;
use crate::http::error::{error_handler, render_panic};
use crate::http::pipeline::{self, PipelineDeps};
use crate::lifecycle::signals::shutdown_signal;
use crate::lifecycle::supervisor::{FatalReports, RunOutcome, Supervisor};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routes;
use crate::security::{run_sweeper, RateLimiterState};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
}

/// The served application: the assembled router behind trailing-slash
/// normalization, so `/api/v2/bootcamps/` reaches the same route as
/// `/api/v2/bootcamps`.
pub type App = NormalizePath<Router>;

/// HTTP server for the API.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    deps: PipelineDeps,
}

impl HttpServer {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        let deps = PipelineDeps::from_config(&config);
        let router = Self::build_router(&config, &deps, AppState { store });
        Self {
            router,
            config,
            deps,
        }
    }

    fn build_router(config: &AppConfig, deps: &PipelineDeps, state: AppState) -> Router {
        let routes = routes::mount(state)
            .layer(CatchPanicLayer::custom(render_panic))
            .layer(middleware::from_fn(error_handler));

        pipeline::apply(routes, config, deps)
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn(metrics::track_requests))
    }

    /// The fully assembled application.
    ///
    /// Normalization has to wrap the router from outside: layers added with
    /// `Router::layer` only run after a route has matched.
    pub fn app(&self) -> App {
        NormalizePathLayer::trim_trailing_slash().layer(self.router.clone())
    }

    pub fn rate_limiter(&self) -> Arc<RateLimiterState> {
        self.deps.rate_limiter.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serve until SIGINT/SIGTERM or the first unhandled failure.
    pub async fn run(
        self,
        listener: TcpListener,
        supervisor: Supervisor,
        reports: FatalReports,
    ) -> Result<RunOutcome, std::io::Error> {
        self.run_until(listener, supervisor, reports, shutdown_signal())
            .await
    }

    /// Serve until `stop` resolves or the first unhandled failure.
    ///
    /// Either way the listener is closed and in-flight requests finish before
    /// this returns.
    pub async fn run_until<F>(
        self,
        listener: TcpListener,
        supervisor: Supervisor,
        mut reports: FatalReports,
        stop: F,
    ) -> Result<RunOutcome, std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let shutdown = Shutdown::new();

        supervisor.spawn(
            "rate-limit-sweeper",
            run_sweeper(self.deps.rate_limiter.clone(), shutdown.listener()),
        );

        tracing::info!(
            "Server running in {} mode on port {}",
            self.config.environment.name(),
            addr.port()
        );

        let (cause_tx, cause_rx) = oneshot::channel();
        let stop_serving = async move {
            let outcome = tokio::select! {
                _ = stop => RunOutcome::Stopped,
                fatal = reports.next() => {
                    tracing::error!(error = %fatal, "Shutting down after unhandled failure");
                    RunOutcome::Fatal(fatal)
                }
            };
            let _ = cause_tx.send(outcome);
        };

        let app = ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(
            self.app(),
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(stop_serving)
            .await?;

        shutdown.trigger();
        let outcome = cause_rx.await.unwrap_or(RunOutcome::Stopped);
        tracing::info!(exit_code = outcome.exit_code(), "HTTP server stopped");
        Ok(outcome)
    }
}
