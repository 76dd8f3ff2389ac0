//! Router assembly, request middleware and the graceful-shutdown server.

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, Request};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use chainwatch_core::WatchService;

use crate::error::ApiError;
use crate::response::respond_failure;
use crate::routes::api_routes;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Largest request body buffered for logging; matches axum's default
/// extractor limit.
const MAX_REQUEST_BODY: usize = 2 * 1024 * 1024;

/// Correlation id for one request, taken from `X-Request-ID` or generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the full application router.
pub fn router(service: WatchService) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .with_state(service)
        .layer(middleware::from_fn(log_requests))
        .layer(middleware::from_fn(assign_request_id))
        .layer(CorsLayer::permissive())
}

async fn assign_request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut resp = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        resp.headers_mut().insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    resp
}

async fn log_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let (parts, body) = req.into_parts();
    let request_id = parts.extensions.get::<RequestId>().cloned().unwrap_or_else(|| RequestId(String::new()));
    let client_ip = client_ip(&parts);
    let user_agent = parts
        .headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let body = match to_bytes(body, MAX_REQUEST_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "failed to read request body");
            return respond_failure(&request_id, ApiError::validation("body", "request body too large or unreadable"));
        }
    };

    info!(
        request_id = %request_id,
        method = %parts.method,
        uri = %parts.uri,
        client_ip = %client_ip,
        user_agent = %user_agent,
        body = %String::from_utf8_lossy(&body),
        "inbound request"
    );

    let resp = next.run(Request::from_parts(parts, Body::from(body))).await;
    let (parts, body) = resp.into_parts();
    let body = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "failed to read response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    info!(
        request_id = %request_id,
        status = parts.status.as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        body = %String::from_utf8_lossy(&body),
        "inbound response"
    );
    Response::from_parts(parts, Body::from(body))
}

/// First `X-Forwarded-For` hop, else the peer address, else empty.
fn client_ip(parts: &Parts) -> String {
    let forwarded = parts
        .headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

/// Serve the API on `listener` until `cancel` fires, then drain in-flight
/// requests.
pub async fn serve(listener: TcpListener, service: WatchService, cancel: CancellationToken) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "HTTP API listening");

    let app = router(service).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    info!("HTTP server shutdown");
    Ok(())
}
