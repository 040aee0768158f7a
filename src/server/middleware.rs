use crate::trace::{TraceContext, TRACE_ID_HEADER};
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use tracing::info;

/// Assign a trace id to every request, hand it to the handler through the
/// request extensions and log the request once the response is ready.
pub async fn trace_requests(mut req: Request, next: Next) -> Response {
    let ctx = TraceContext::from_header(
        req.headers()
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    );
    let trace_id = ctx.trace_id.clone();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ctx);

    let started = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = started.elapsed().as_millis();

    info!(
        trace_id = %trace_id,
        "{} {} {} {}ms",
        method,
        path,
        response.status().as_u16(),
        elapsed
    );

    if let Ok(value) = HeaderValue::from_str(trace_id.as_str()) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}
