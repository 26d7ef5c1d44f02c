//! Shared protocol bindings, data model and error taxonomy.
//!
//! - [`proto`] - Generated `GeoIPService` messages, client and server.
//! - [`types`] - Transport-neutral request and result types.
//! - [`error`] - The crate-wide [`Error`](error::Error) enum.

pub mod error;
pub mod types;

pub use error::{Error, InvalidInput, Result};

/// gRPC service and message definitions generated from `proto/geoip.proto`.
///
/// ## Service
///
/// - `CheckCountry` - Resolves an IP to its country and checks it against an
///   allow-list.
/// - `Health` - Static health payload, independent of the database.
///
/// The Rust server trait is `geo_ip_service_server::GeoIpService`; the wire
/// name stays `geoip.GeoIPService`.
pub mod proto {
    tonic::include_proto!("geoip");

    /// Encoded descriptor set used to serve gRPC reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("geoip_descriptor");
}
