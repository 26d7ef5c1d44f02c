//! `GeoIPService` implementation backed by the shared [`LookupService`].

use crate::server::telemetry::record_check;
use geoip_core::{
    proto::{
        CheckCountryRequest, CheckCountryResponse, HealthRequest, HealthResponse,
        geo_ip_service_server::GeoIpService,
    },
    service::LookupService,
    types::CheckRequest,
};
use std::time::Instant;
use tonic::{Request, Response, Status};

#[derive(Clone)]
pub struct GeoIpRpc {
    service: LookupService,
}

impl GeoIpRpc {
    pub fn new(service: LookupService) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl GeoIpService for GeoIpRpc {
    /// Validation failures come back as `InvalidArgument`, database faults as
    /// an opaque `Internal`.
    #[tracing::instrument(skip_all, fields(ip = %req.get_ref().ip_address))]
    async fn check_country(
        &self,
        req: Request<CheckCountryRequest>,
    ) -> Result<Response<CheckCountryResponse>, Status> {
        let request = CheckRequest::from(req.into_inner());

        let start = Instant::now();
        let outcome = self.service.check_country(&request);
        record_check("grpc", &outcome, start.elapsed());

        match outcome {
            Ok(result) => Ok(Response::new(result.into())),
            Err(err) => {
                if !err.is_client_error() {
                    tracing::error!(error = %err, ip = %request.ip_address, "Country check failed");
                }
                Err(err.into())
            }
        }
    }

    async fn health(
        &self,
        _req: Request<HealthRequest>,
    ) -> Result<Response<HealthResponse>, Status> {
        Ok(Response::new(HealthResponse::healthy()))
    }
}
