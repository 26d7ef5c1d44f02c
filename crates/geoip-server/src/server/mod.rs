//! Server-side components of the GeoIP service.
//!
//! - [`config`] - CLI/environment configuration.
//! - [`http`] - axum HTTP/JSON adapter.
//! - [`rpc`] - tonic gRPC adapter.
//! - [`shutdown`] - termination signal handling.
//! - [`telemetry`] - structured logging and optional OpenTelemetry export.
//!
//! Both adapters share one [`geoip_core::service::LookupService`]; they are
//! wired together in `main.rs`.

pub mod config;
pub mod http;
pub mod rpc;
pub mod shutdown;
pub mod telemetry;
