use crate::{
    config::Config,
    docs::ApiDoc,
    handlers::{diagnostics, health_check, ready_check, upload_file},
    websocket::websocket_handler,
    AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for multipart boundaries and the roomCode field on top of the file itself
const UPLOAD_FORM_OVERHEAD: usize = 64 * 1024;

/// Create API routes
pub fn create_api_routes() -> Router<Arc<AppState>> {
    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/diagnostics", get(diagnostics))
}

/// Assemble the full application: socket endpoint, upload, static files and API
pub fn create_app(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_bytes + UPLOAD_FORM_OVERHEAD;
    let cors = cors_layer(&state.config);
    let uploads = ServeDir::new(&state.config.upload_dir);
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/upload", post(upload_file).layer(DefaultBodyLimit::max(upload_limit)))
        .nest("/api", create_api_routes())
        .with_state(state)
        .nest_service("/uploads", uploads)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback_service(static_files)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any)
    } else if config.is_development() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}
