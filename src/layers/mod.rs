use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Создает CORS слой для API
pub fn create_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Создает слой трассировки HTTP запросов
pub fn create_trace() -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>
{
    TraceLayer::new_for_http()
}
