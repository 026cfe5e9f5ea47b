//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Extension},
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::apps::{AppNameProvider, CommandNameProvider};
use crate::kernel::jobs::JobManager;
use crate::server::routes::{
    discard_job_handler, health_handler, job_result_handler, job_status_handler,
    list_jobs_handler, process_icon_handler, submit_job_handler,
};

/// Uploads to `/process-icon` may be full-size artwork.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub jobs: JobManager,
    pub config: Arc<Config>,
    /// Used when a submit request does not carry its own app list.
    pub default_provider: Arc<dyn AppNameProvider>,
}

impl AppState {
    pub fn new(jobs: JobManager, config: Config) -> Self {
        let default_provider: Arc<dyn AppNameProvider> =
            match CommandNameProvider::from_command_line(&config.app_list_command) {
                Some(provider) => Arc::new(provider),
                None => Arc::new(CommandNameProvider::system_profiler()),
            };
        Self {
            jobs,
            config: Arc::new(config),
            default_provider,
        }
    }

    pub fn with_default_provider(mut self, provider: Arc<dyn AppNameProvider>) -> Self {
        self.default_provider = provider;
        self
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/health", get(health_handler))
        .route("/jobs", post(submit_job_handler).get(list_jobs_handler))
        .route("/jobs/:id", get(job_status_handler))
        .route("/jobs/:id/result", get(job_result_handler))
        .route("/jobs/:id/discard", post(discard_job_handler))
        .route(
            "/process-icon",
            post(process_icon_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}
