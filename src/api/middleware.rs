// Middleware layers applied by create_router()

use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Tracing middleware
///
/// Logs: method, path, status, duration
pub fn tracing_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}

/// Body size limit middleware
///
/// Returns 413 Payload Too Large if exceeded
pub fn body_size_limit_layer(limit_bytes: usize) -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(limit_bytes)
}
