//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "tscribe_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "tscribe_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "tscribe_http_requests_in_flight";

    // Job lifecycle
    pub const JOBS_CREATED_TOTAL: &str = "tscribe_jobs_created_total";
    pub const JOBS_RECOVERED_TOTAL: &str = "tscribe_jobs_recovered_total";
    pub const DISPATCH_FAILURES_TOTAL: &str = "tscribe_dispatch_failures_total";
    pub const WEBHOOKS_TOTAL: &str = "tscribe_webhooks_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "tscribe_rate_limit_hits_total";
}

/// Path label for requests that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

/// Record an HTTP request. `route` is a route template, never a raw path.
pub fn record_http_request(method: &str, route: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", route.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a newly created job.
pub fn record_job_created(model_size: &str) {
    let labels = [("model_size", model_size.to_string())];
    counter!(names::JOBS_CREATED_TOTAL, &labels).increment(1);
}

/// Record a submission answered with an existing job.
pub fn record_job_recovered(model_size: &str) {
    let labels = [("model_size", model_size.to_string())];
    counter!(names::JOBS_RECOVERED_TOTAL, &labels).increment(1);
}

/// Record a worker trigger that did not go through.
pub fn record_dispatch_failure() {
    counter!(names::DISPATCH_FAILURES_TOTAL).increment(1);
}

/// Record a callback by outcome (`applied`, or the error code).
pub fn record_webhook(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::WEBHOOKS_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(route: &str) {
    let labels = [("endpoint", route.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Route template the request matched (`/api/status/:id`), so label
/// cardinality is bounded by the router rather than by callers.
pub fn route_label<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string())
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let route = route_label(&request);
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &route, status, duration);

    response
}
