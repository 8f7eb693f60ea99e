use axum::Router;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    map_response_body::MapResponseBodyLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Instances with full student rosters get large; 8 MiB covers a faculty.
const BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Synchronous endpoints (options, execute, explain) must answer within this.
/// Generation itself runs as a job and is not bound by it.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Wraps the router in request tracing, permissive CORS, a body limit and a
/// per-request timeout.
pub fn wrap<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(MapResponseBodyLayer::new(axum::body::Body::new))
            .layer(RequestBodyLimitLayer::new(BODY_LIMIT)),
    )
}
