use crate::server::telemetry::record_check;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use geoip_core::{
    Error, InvalidInput,
    service::LookupService,
    types::{CheckRequest, CheckResult, HEALTHY, SERVICE_NAME},
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::time::Instant;

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct HealthBody {
    pub status: &'static str,
    pub service: &'static str,
}

/// JSON shape of `POST /v1/check`. Absent and `null` fields decode as empty.
#[derive(Deserialize, Debug, Default)]
pub struct CheckBody {
    pub ip_address: Option<String>,
    pub allowed_countries: Option<Vec<String>>,
}

impl From<CheckBody> for CheckRequest {
    fn from(body: CheckBody) -> Self {
        CheckRequest::new(
            body.ip_address.unwrap_or_default(),
            body.allowed_countries.unwrap_or_default(),
        )
    }
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct CheckReply {
    pub allowed: bool,
    pub country: String,
}

impl From<CheckResult> for CheckReply {
    fn from(result: CheckResult) -> Self {
        Self {
            allowed: result.allowed,
            country: result.country,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// An error rendered as `{error, message}` with a matching status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: &'static str,
}

impl ApiError {
    pub const INVALID_REQUEST: Self = Self::bad_request("invalid_request", "Invalid JSON format");
    pub const MISSING_IP: Self = Self::bad_request("missing_ip", "IP address is required");
    pub const MISSING_COUNTRIES: Self = Self::bad_request(
        "missing_countries",
        "At least one allowed country is required",
    );
    pub const INVALID_IP: Self = Self::bad_request("invalid_ip", "Invalid IP address format");
    pub const LOOKUP_FAILED: Self = Self {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "lookup_failed",
        message: "Failed to check country for IP address",
    };
    pub const INTERNAL: Self = Self {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal_error",
        message: "Internal server error",
    };

    const fn bad_request(code: &'static str, message: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message,
        }
    }
}

impl From<&Error> for ApiError {
    fn from(err: &Error) -> Self {
        match err {
            Error::InvalidInput(InvalidInput::MissingIp) => Self::MISSING_IP,
            Error::InvalidInput(InvalidInput::MissingCountries) => Self::MISSING_COUNTRIES,
            Error::InvalidInput(InvalidInput::InvalidIp { .. }) => Self::INVALID_IP,
            Error::ResolutionFailure { .. }
            | Error::DatabaseOpen { .. }
            | Error::TransportBind { .. } => Self::LOOKUP_FAILED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code,
            message: (!self.message.is_empty()).then_some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

pub async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: HEALTHY,
        service: SERVICE_NAME,
    })
}

/// `POST /v1/check`.
///
/// The body is decoded by hand instead of through `Json<T>` so that a missing
/// content type or a type mismatch is reported as `invalid_request` rather
/// than axum's 415/422 rejections.
pub async fn check_country(
    State(service): State<LookupService>,
    body: Bytes,
) -> Result<Json<CheckReply>, ApiError> {
    let request = CheckRequest::from(decode_check_body(&body)?);

    let start = Instant::now();
    let outcome = service.check_country(&request);
    record_check("http", &outcome, start.elapsed());

    match outcome {
        Ok(result) => Ok(Json(result.into())),
        Err(err) => {
            if !err.is_client_error() {
                tracing::error!(error = %err, ip = %request.ip_address, "Country check failed");
            }
            Err(ApiError::from(&err))
        }
    }
}

/// Reads the first JSON value of `body`; anything after it is ignored. A
/// bare `null` decodes like `{}`.
fn decode_check_body(body: &[u8]) -> Result<CheckBody, ApiError> {
    let first = serde_json::Deserializer::from_slice(body)
        .into_iter::<Option<CheckBody>>()
        .next();

    match first {
        Some(Ok(body)) => Ok(body.unwrap_or_default()),
        Some(Err(e)) => {
            tracing::error!(error = %e, "Failed to decode request");
            Err(ApiError::INVALID_REQUEST)
        }
        None => {
            tracing::error!("Failed to decode request: empty body");
            Err(ApiError::INVALID_REQUEST)
        }
    }
}

/// Turns a panic inside a handler into a 500 without taking the server down.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = detail, "Handler panicked");

    let mut response = ApiError::INTERNAL.into_response();
    response.headers_mut().insert(
        header::CONNECTION,
        header::HeaderValue::from_static("close"),
    );
    response
}
