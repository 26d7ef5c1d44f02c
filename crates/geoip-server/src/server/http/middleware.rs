use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";
const X_REQUEST_ID: &str = "x-request-id";

/// Access log: one event per request, emitted after the response is built.
pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let request_id = header_str(request.headers(), X_REQUEST_ID)
        .unwrap_or_default()
        .to_owned();
    let user_agent = header_str(request.headers(), header::USER_AGENT.as_str())
        .unwrap_or_default()
        .to_owned();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let remote_addr = client_ip(request.headers(), peer);

    let response = next.run(request).await;

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        remote_addr = %remote_addr,
        user_agent = %user_agent,
        "HTTP request"
    );

    response
}

/// Best guess at the originating client: the first `X-Forwarded-For` hop,
/// then `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = header_str(headers, X_FORWARDED_FOR)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .and_then(|hop| hop.parse::<IpAddr>().ok());
    let real_ip = || {
        header_str(headers, X_REAL_IP)
            .map(str::trim)
            .and_then(|value| value.parse::<IpAddr>().ok())
    };

    match forwarded.or_else(real_ip) {
        Some(ip) => ip.to_string(),
        None => peer.map(|addr| addr.to_string()).unwrap_or_default(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
