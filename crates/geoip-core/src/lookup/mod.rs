//! Geo-lookup client: resolves an IP address to an ISO country code.
//!
//! [`CountryLookup`] is the seam between the lookup service and the
//! geo-database. It only exposes `&self` reads, so one opened database can be
//! shared as `Arc<dyn CountryLookup>` across every request task without
//! locking. [`MaxMindDatabase`] is the production implementation.

mod maxmind;

pub use maxmind::MaxMindDatabase;

use std::net::IpAddr;

/// An internal fault while reading the database (corrupt record, I/O error).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("geo database read failed: {message}")]
pub struct LookupError {
    pub message: String,
}

impl LookupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Read-only country resolution over an opened geo-database.
pub trait CountryLookup: Send + Sync {
    /// Resolves `ip` to its ISO 3166-1 alpha-2 country code.
    ///
    /// Returns `Ok(None)` when the database has no entry for the address.
    /// That is a normal outcome, not a failure.
    fn lookup_country(&self, ip: IpAddr) -> Result<Option<String>, LookupError>;
}
