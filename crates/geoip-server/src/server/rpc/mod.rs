//! gRPC adapter.
//!
//! Serves `geoip.GeoIPService` next to the standard gRPC health service and
//! server reflection. gRPC-Web clients are accepted over HTTP/1.1.

pub mod handler;

use geoip_core::{proto::FILE_DESCRIPTOR_SET, proto::geo_ip_service_server::GeoIpServiceServer};
use handler::GeoIpRpc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::{codec::CompressionEncoding, transport::Server};
use tonic_health::server::HealthReporter;
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

/// Serves the gRPC API on `listener` until `shutdown` is cancelled, then
/// waits for in-flight calls to finish.
pub async fn serve(
    listener: TcpListener,
    rpc: GeoIpRpc,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<GeoIpServiceServer<GeoIpRpc>>()
        .await;

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new()),
        )
        .add_service(health_service)
        .add_service(reflection)
        .add_service(build_geoip_service(rpc))
        .serve_with_incoming_shutdown(
            TcpListenerStream::new(listener),
            drain(shutdown, health_reporter),
        )
        .await?;

    tracing::info!("gRPC server stopped");
    Ok(())
}

fn build_geoip_service(rpc: GeoIpRpc) -> GeoIpServiceServer<GeoIpRpc> {
    GeoIpServiceServer::new(rpc)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}

/// Resolves once shutdown starts, after health checks report NOT_SERVING so
/// load balancers stop routing new calls here.
async fn drain(shutdown: CancellationToken, health_reporter: HealthReporter) {
    shutdown.cancelled().await;
    health_reporter
        .set_not_serving::<GeoIpServiceServer<GeoIpRpc>>()
        .await;
}
