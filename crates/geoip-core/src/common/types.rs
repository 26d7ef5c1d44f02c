//! Transport-neutral request and result types.
//!
//! Both adapters translate their envelopes into [`CheckRequest`] and render
//! [`CheckResult`] back, so the lookup service never sees protocol types.

use crate::proto::{CheckCountryRequest, CheckCountryResponse, HealthResponse};

/// Name reported by every health endpoint.
pub const SERVICE_NAME: &str = "geoip-service";

/// Status reported by every health endpoint.
pub const HEALTHY: &str = "healthy";

/// A single allow-list check. Built per request and discarded afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckRequest {
    /// IPv4 or IPv6 literal, validated by the lookup service.
    pub ip_address: String,
    /// ISO 3166-1 alpha-2 codes. Order and duplicates are irrelevant.
    pub allowed_countries: Vec<String>,
}

impl CheckRequest {
    pub fn new(ip_address: impl Into<String>, allowed_countries: Vec<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            allowed_countries,
        }
    }
}

/// Outcome of a [`CheckRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckResult {
    pub allowed: bool,
    /// Resolved ISO code, empty when the address has no database entry.
    pub country: String,
}

impl CheckResult {
    /// Result for an address the database has no country for.
    pub fn unresolved() -> Self {
        Self::default()
    }
}

impl From<CheckCountryRequest> for CheckRequest {
    fn from(req: CheckCountryRequest) -> Self {
        Self {
            ip_address: req.ip_address,
            allowed_countries: req.allowed_countries,
        }
    }
}

impl From<CheckResult> for CheckCountryResponse {
    fn from(result: CheckResult) -> Self {
        Self {
            allowed: result.allowed,
            country: result.country,
        }
    }
}

impl HealthResponse {
    /// The static payload returned by the RPC `Health` method.
    pub fn healthy() -> Self {
        Self {
            status: HEALTHY.to_string(),
            service: SERVICE_NAME.to_string(),
        }
    }
}
