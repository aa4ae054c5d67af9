use axum::extract::rejection::JsonRejection;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum RelayError {
    /// The client request is missing or has an unusable field.  No upstream call is made.
    #[error("{0}")]
    Validation(&'static str),
    /// A server-held credential or setting is absent.  No upstream call is made.
    #[error("{0}")]
    Configuration(&'static str),
    #[error("{provider} responded with {status}")]
    Upstream {
        provider: &'static str,
        status: StatusCode,
        message: Option<String>,
        details: Value,
    },
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned an unusable reply: {reason}")]
    MalformedReply {
        provider: &'static str,
        reason: String,
    },
}

impl From<JsonRejection> for RelayError {
    fn from(_: JsonRejection) -> Self {
        RelayError::Validation("Invalid JSON body")
    }
}

pub fn handle_error(endpoint: &str, e: &RelayError) {
    match e {
        RelayError::Validation(_) => warn!(endpoint, error=%e, "rejected client request"),
        RelayError::Upstream { .. } => error!(endpoint, error=%e, "upstream rejected request"),
        _ => error!(endpoint, error=%e, "relay failed"),
    }
}
