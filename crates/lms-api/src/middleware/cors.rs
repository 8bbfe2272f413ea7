use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Creates the CORS layer for the read-mostly API
///
/// With no configured origin every origin is allowed, otherwise only the
/// listed ones. Entries that are not valid header values are ignored.
pub fn create_cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins = allowed_origins
        .into_iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    layer.allow_origin(AllowOrigin::list(origins))
}
