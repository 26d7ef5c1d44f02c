#![doc = include_str!("../README.md")]

mod server;

use anyhow::Context;
use clap::Parser;
use geoip_core::{Error, lookup::MaxMindDatabase, service::LookupService};
use server::config::{CliArgs, ServerConfig};
use server::rpc::handler::GeoIpRpc;
use server::shutdown::shutdown_signal;
use server::telemetry::init_telemetry;
use server::{http, rpc};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry(config.log_level)?;

    let res = run(config).await;
    if let Err(e) = &res {
        tracing::error!("GeoIP service failed: {e:#}");
    }

    providers.shutdown();
    res
}

async fn run(config: ServerConfig) -> anyhow::Result<()> {
    log_startup_info(&config);

    let database = Arc::new(MaxMindDatabase::open(&config.db_path)?);
    let service = LookupService::new(database.clone());

    let http_listener = bind("http", config.http_addr).await?;
    let grpc_listener = bind("grpc", config.grpc_addr).await?;

    let shutdown = CancellationToken::new();
    let mut servers = JoinSet::new();
    servers.spawn(supervise(
        "http",
        http::serve(
            http_listener,
            http::router(service.clone(), config.request_timeout),
            shutdown.clone(),
        ),
        shutdown.clone(),
    ));
    servers.spawn(supervise(
        "grpc",
        rpc::serve(grpc_listener, GeoIpRpc::new(service), shutdown.clone()),
        shutdown.clone(),
    ));

    tokio::select! {
        () = shutdown_signal() => {},
        () = shutdown.cancelled() => tracing::warn!("A server stopped on its own"),
    }

    tracing::info!("Shutting down servers...");
    shutdown.cancel();

    let mut failure = None;
    let drained = tokio::time::timeout(config.shutdown_timeout, async {
        while let Some(joined) = servers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failure = Some(e),
                Err(e) => failure = Some(anyhow::Error::new(e).context("server task panicked")),
            }
        }
    })
    .await;

    if drained.is_err() {
        tracing::error!(
            timeout_secs = config.shutdown_timeout.as_secs(),
            "Servers did not drain in time, forcing shutdown"
        );
        servers.shutdown().await;
    }

    // Both transports are down: nothing else may hold the database now.
    match Arc::try_unwrap(database) {
        Ok(database) => database.close(),
        Err(_) => tracing::warn!("GeoIP database still referenced by aborted requests"),
    }

    tracing::info!("Servers exited");
    failure.map_or(Ok(()), Err)
}

async fn bind(transport: &'static str, addr: SocketAddr) -> Result<TcpListener, Error> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::TransportBind {
            transport,
            addr,
            source,
        })?;
    let local = listener.local_addr().unwrap_or(addr);
    tracing::info!(transport, address = %local, "Listener bound");
    Ok(listener)
}

/// Runs one server to completion. Whatever the reason it stops, the shared
/// token is cancelled so the other server follows.
async fn supervise(
    transport: &'static str,
    server: impl Future<Output = anyhow::Result<()>>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let res = server.await;
    if let Err(e) = &res {
        tracing::error!(transport, error = %e, "Server failed");
    }
    shutdown.cancel();
    res.with_context(|| format!("{transport} server failed"))
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting GeoIP Service with full config: {:?}", config);
    } else {
        tracing::info!(
            http_addr = %config.http_addr,
            grpc_addr = %config.grpc_addr,
            db_path = %config.db_path.display(),
            "Starting GeoIP Service"
        );
    }
}
