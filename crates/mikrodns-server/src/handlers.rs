//! Request validation, dispatch and error mapping for the webhook routes.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use mikrodns_core::error::Error;
use mikrodns_core::reconciler::Reconciler;
use mikrodns_core::record::{self, DnsRecord, RecordAction, RecordChange};

/// Inbound payload of `/dns`.
///
/// All fields are optional at the deserialization layer so that a missing or
/// malformed value produces a 400 naming the field, rather than a generic
/// body rejection.
#[derive(Debug, Deserialize)]
pub struct DnsChangeRequest {
    /// Record name, required
    pub fqdn: Option<String>,
    /// Record address, required unless the action is `delete`
    pub address: Option<String>,
    /// `create`, `update` or `delete`; absent means upsert
    pub action: Option<String>,
}

impl DnsChangeRequest {
    /// Validate the payload into a change to apply
    pub fn into_change(self) -> Result<RecordChange, Error> {
        let fqdn = self
            .fqdn
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::validation("fqdn", "is required"))?;
        record::validate_fqdn(&fqdn)?;

        let action = match self.action {
            None => RecordAction::Update,
            Some(raw) => raw.parse()?,
        };

        if action == RecordAction::Delete {
            return Ok(RecordChange::Delete { fqdn });
        }

        let raw_address = self
            .address
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::validation("address", "is required"))?;
        let address = raw_address.parse().map_err(|_| {
            Error::validation(
                "address",
                format!("{raw_address:?} is not an IPv4 or IPv6 address"),
            )
        })?;

        let record = DnsRecord::new(fqdn, address)?;
        Ok(match action {
            RecordAction::Create => RecordChange::Create(record),
            _ => RecordChange::Update(record),
        })
    }
}

/// Success body: `{"status":"success"}` (and the probe variants)
#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
}

/// Error body: `{"status":"error","error":"..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub error: String,
}

/// Wraps a core error for HTTP status mapping
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            // Everything else reached the router layer and failed there.
            _ => StatusCode::BAD_GATEWAY,
        };

        (
            status,
            Json(ErrorBody {
                status: "error",
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Reconcile one record (`GET`/`POST /dns`)
pub async fn reconcile(
    State(reconciler): State<Reconciler>,
    Json(request): Json<DnsChangeRequest>,
) -> Result<Json<StatusBody>, ApiError> {
    let change = request.into_change().map_err(|e| {
        warn!("rejected /dns request: {e}");
        ApiError(e)
    })?;

    let fqdn = change.fqdn().to_string();
    reconciler.apply(change).await.map_err(|e| {
        error!("reconciling {fqdn} failed: {e}");
        ApiError(e)
    })?;

    Ok(Json(StatusBody { status: "success" }))
}

/// `GET /readiness`
pub async fn readiness() -> Json<StatusBody> {
    Json(StatusBody { status: "ready" })
}

/// `GET /liveness`
pub async fn liveness() -> Json<StatusBody> {
    Json(StatusBody { status: "live" })
}
