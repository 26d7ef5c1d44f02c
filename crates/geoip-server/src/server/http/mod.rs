//! HTTP/JSON adapter.
//!
//! - `GET /health` - static health payload.
//! - `POST /v1/check` - country allow-list check.
//!
//! Layers, outermost first: request id (generated unless the client sent
//! `x-request-id`, echoed on the response), access log, panic recovery,
//! per-request timeout (504 Gateway Timeout).

pub mod handler;
pub mod middleware;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use geoip_core::service::LookupService;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

pub fn router(service: LookupService, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(handler::health))
        .route("/v1/check", post(handler::check_country))
        .with_state(service)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(axum::middleware::from_fn(middleware::log_request))
                .layer(CatchPanicLayer::custom(handler::handle_panic))
                .layer(timeout_layer(request_timeout)),
        )
}

fn timeout_layer(request_timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::GATEWAY_TIMEOUT, request_timeout)
}

/// Serves `router` on `listener` until `shutdown` is cancelled, then waits
/// for in-flight requests to finish.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown.cancelled_owned())
    .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn slow_requests_time_out_with_504() {
        async fn slow() -> &'static str {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "too late"
        }

        let app = Router::new()
            .route("/slow", get(slow))
            .layer(timeout_layer(Duration::from_millis(20)));

        let request = Request::builder().uri("/slow").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
