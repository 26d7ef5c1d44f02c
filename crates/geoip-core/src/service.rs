//! The lookup service: validation, resolution and the allow/deny decision.
//!
//! [`LookupService`] is the only component with domain logic. Both transport
//! adapters call [`LookupService::check_country`] and only translate its
//! [`Error`] variants into their own status codes, so validation rules cannot
//! drift between HTTP and gRPC.
//!
//! ## Algorithm
//!
//! 1. Reject an empty IP ([`InvalidInput::MissingIp`]).
//! 2. Reject an empty allow-list ([`InvalidInput::MissingCountries`]). This
//!    happens before parsing, so an empty allow-list fails regardless of the
//!    IP.
//! 3. Parse the IP as an IPv4/IPv6 literal ([`InvalidInput::InvalidIp`]).
//! 4. Resolve the country. A read fault is a [`Error::ResolutionFailure`];
//!    a missing entry yields `{allowed: false, country: ""}`.
//! 5. `allowed` is exact, case-sensitive membership in the allow-list.
//!
//! There are no retries and no caching.

use crate::{
    Error, InvalidInput, Result,
    lookup::CountryLookup,
    types::{CheckRequest, CheckResult},
};
use std::net::IpAddr;
use std::sync::Arc;

/// Country allow-list checks over a shared, read-only geo-database.
///
/// Cloning is cheap: clones share the same database handle.
#[derive(Clone)]
pub struct LookupService {
    database: Arc<dyn CountryLookup>,
}

impl LookupService {
    pub fn new(database: Arc<dyn CountryLookup>) -> Self {
        Self { database }
    }

    /// Checks whether the country of `request.ip_address` is allowed.
    #[tracing::instrument(level = "debug", skip_all, fields(ip = %request.ip_address))]
    pub fn check_country(&self, request: &CheckRequest) -> Result<CheckResult> {
        let ip = validate(request)?;

        let country = match self.database.lookup_country(ip) {
            Ok(country) => country,
            Err(e) => {
                tracing::error!(ip = %ip, error = %e, "Failed to lookup IP");
                return Err(Error::ResolutionFailure {
                    context: e.to_string(),
                });
            }
        };

        let Some(country) = country.filter(|code| !code.is_empty()) else {
            tracing::warn!(ip = %ip, "No country found for IP");
            return Ok(CheckResult::unresolved());
        };

        let allowed = request.allowed_countries.iter().any(|c| *c == country);

        tracing::info!(
            ip = %ip,
            country = %country,
            allowed,
            allowed_countries = ?request.allowed_countries,
            "Country check performed"
        );

        Ok(CheckResult { allowed, country })
    }
}

fn validate(request: &CheckRequest) -> core::result::Result<IpAddr, InvalidInput> {
    if request.ip_address.is_empty() {
        return Err(InvalidInput::MissingIp);
    }
    if request.allowed_countries.is_empty() {
        return Err(InvalidInput::MissingCountries);
    }
    request
        .ip_address
        .parse::<IpAddr>()
        .map_err(|_| InvalidInput::InvalidIp {
            value: request.ip_address.clone(),
        })
}
