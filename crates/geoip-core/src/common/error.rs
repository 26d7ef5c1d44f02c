//! Error types for the geolocation lookup service.
//!
//! This module defines the central `Error` enum shared by the lookup service
//! and both transport adapters. It implements `From<Error>` for
//! `tonic::Status` so gRPC handlers can propagate failures with `?`. The HTTP
//! adapter maps the same variants onto status codes and error bodies.
//!
//! ## Error Cases
//! - `InvalidInput`: The caller sent a request that can never succeed (missing
//!   IP, empty allow-list, unparseable IP).
//! - `ResolutionFailure`: The database could not be read for a well-formed
//!   address. Details are logged, never returned to callers.
//! - `DatabaseOpen`: The database could not be opened. Fatal at startup.
//! - `TransportBind`: A listening socket could not be bound. Fatal at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Client-caused validation failures.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    #[error("IP address is required")]
    MissingIp,

    #[error("at least one allowed country is required")]
    MissingCountries,

    /// Not a valid IPv4 or IPv6 literal.
    #[error("invalid IP address: {value}")]
    InvalidIp { value: String },
}

/// Unified error type for the geolocation lookup service.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// The database returned an internal fault for a valid address.
    #[error("Resolution failure: {context}")]
    ResolutionFailure { context: String },

    /// The database file is missing, malformed or of an unsupported type.
    #[error("Failed to open geo database {}: {reason}", path.display())]
    DatabaseOpen { path: PathBuf, reason: String },

    /// A transport could not bind its listening socket.
    #[error("Failed to bind {transport} listener on {addr}: {source}")]
    TransportBind {
        transport: &'static str,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Returns `true` when the failure was caused by the caller.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(InvalidInput::InvalidIp { .. }) => {
                Status::invalid_argument("invalid IP address")
            }
            Error::InvalidInput(input) => Status::invalid_argument(input.to_string()),
            Error::ResolutionFailure { .. } => {
                Status::internal("failed to check country for IP address")
            }
            Error::DatabaseOpen { .. } => Status::unavailable("geo database is unavailable"),
            Error::TransportBind { .. } => Status::internal("transport failure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn invalid_input_maps_to_invalid_argument() {
        let status = Status::from(Error::from(InvalidInput::MissingIp));
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "IP address is required");

        let status = Status::from(Error::from(InvalidInput::MissingCountries));
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "at least one allowed country is required");
    }

    #[test]
    fn invalid_ip_does_not_echo_the_value() {
        let status = Status::from(Error::from(InvalidInput::InvalidIp {
            value: "not-an-ip".to_string(),
        }));
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "invalid IP address");
    }

    #[test]
    fn resolution_failure_is_opaque() {
        let err = Error::ResolutionFailure {
            context: "decoding error at offset 1234".to_string(),
        };
        assert!(!err.is_client_error());

        let status = Status::from(err);
        assert_eq!(status.code(), Code::Internal);
        assert!(!status.message().contains("offset"));
    }
}
