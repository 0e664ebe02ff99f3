use std::time::Instant;

use axum::{
    body::{Body, to_bytes},
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::{error, info};

/// 记录每个请求的方法、路径、状态码和耗时，服务端错误额外记录响应体
pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if !response.status().is_server_error() {
        info!(%method, %path, status = response.status().as_u16(), elapsed_ms, "request handled");
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, 1024).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read error response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    error!(
        %method,
        %path,
        status = parts.status.as_u16(),
        elapsed_ms,
        body = %String::from_utf8_lossy(&bytes),
        "server error"
    );

    // 重置body以便重新构建响应
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}
