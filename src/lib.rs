pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::api::middleware::request_id::REQUEST_ID_HEADER;
use crate::config::Config;
use crate::services::file_service::FileService;
use crate::services::record_store::RecordStore;
use crate::services::storage::ObjectStorage;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
    middleware::from_fn,
    routing::{get, post, put},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::ping,
        api::handlers::health::health_check,
        api::handlers::users::create_user,
        api::handlers::users::get_user,
        api::handlers::users::list_user_files,
        api::handlers::users::delete_user_file,
        api::handlers::users::get_user_storage,
        api::handlers::files::create_file,
        api::handlers::files::get_file,
        api::handlers::files::update_scan_status,
    ),
    components(
        schemas(
            api::handlers::health::PingResponse,
            api::handlers::health::HealthResponse,
            api::handlers::users::CreateUserRequest,
            api::handlers::users::UserResponse,
            api::handlers::users::FileListResponse,
            api::handlers::users::StorageSummaryResponse,
            api::handlers::files::CreateFileRequest,
            api::handlers::files::ScanStatusRequest,
            api::handlers::files::FileResponse,
            entities::files::ScanStatus,
            services::lifecycle::FileState,
        )
    ),
    tags(
        (name = "system", description = "Liveness and health"),
        (name = "users", description = "User records and owned files"),
        (name = "files", description = "File records and scan verdicts")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub storage: Arc<dyn ObjectStorage>,
    pub file_service: Arc<FileService>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: RecordStore, storage: Arc<dyn ObjectStorage>, config: Config) -> Self {
        let file_service = Arc::new(FileService::new(store.clone(), storage.clone()));
        Self {
            store,
            storage,
            file_service,
            config,
        }
    }
}

/// Span for one HTTP request, keyed by the id the request-id layer assigned
pub fn make_request_span<B>(request: &Request<B>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

pub fn create_app(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(make_request_span::<Body>)
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(|response: &Response<Body>, latency: Duration, _span: &Span| {
            tracing::info!(
                "📤 Finished in {:?} with status {}",
                latency,
                response.status()
            );
        });

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/ping", get(api::handlers::health::ping))
        .route("/health", get(api::handlers::health::health_check))
        .route("/users", post(api::handlers::users::create_user))
        .route("/users/:id", get(api::handlers::users::get_user))
        .route("/users/:id/files", get(api::handlers::users::list_user_files))
        .route(
            "/users/:id/files/:file_id",
            axum::routing::delete(api::handlers::users::delete_user_file),
        )
        .route("/files", post(api::handlers::files::create_file))
        .route("/files/:id", get(api::handlers::files::get_file))
        .route(
            "/files/:id/scan-status",
            put(api::handlers::files::update_scan_status),
        )
        .route(
            "/users/:id/storage",
            get(api::handlers::users::get_user_storage),
        )
        // Layers wrap outward: the request id is set before the trace span opens
        .layer(trace_layer)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .with_state(state)
}
