// src/middleware.rs

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::Config;

/// Redirects plain-HTTP requests to HTTPS unless SSL is disabled.
///
/// The scheme is taken from `X-Forwarded-Proto`, as set by the TLS proxy.
pub async fn https_redirect(
    State(config): State<Config>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if config.ssl_disable || forwarded_https(req.headers()) {
        return next.run(req).await;
    }

    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            url::Url::parse(&config.server_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
        })
        .unwrap_or_else(|| "localhost".to_string());
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = format!("https://{host}{path}");

    tracing::debug!("Redirecting to {}", target);
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, target)]).into_response()
}

fn forwarded_https(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}
