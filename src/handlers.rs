use crate::error::{handle_error, RelayError};
use crate::relays;
use crate::types::{
    AppState, CallRequest, ContactRequest, Envelope, Failure, ScenarioCatalog, DEMO_SCENARIOS,
};
use crate::utils::redact_failure;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::instrument;

/// HTTP status used when the provider itself rejects a relayed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFailureStatus {
    /// Answer 200 and let the browser read `success: false` from the body.
    Ok,
    /// Answer with the provider's own status.
    Mirror,
    InternalServerError,
}

/// How one relay endpoint turns a `RelayError` into its failure envelope.
#[derive(Debug)]
pub struct Endpoint {
    pub name: &'static str,
    pub failure_message: &'static str,
    pub upstream_failure: UpstreamFailureStatus,
    /// Prefer the provider's own error message over `failure_message`.
    pub surface_upstream_message: bool,
    pub include_details: bool,
    /// Put transport and decoding error text (which names the upstream URL) into `details`.
    pub include_transport_details: bool,
}

pub const CALL_ENDPOINT: Endpoint = Endpoint {
    name: "initiate_call",
    failure_message: "Failed to initiate call",
    upstream_failure: UpstreamFailureStatus::Ok,
    surface_upstream_message: true,
    include_details: false,
    include_transport_details: false,
};

pub const TOKEN_ENDPOINT: Endpoint = Endpoint {
    name: "issue_token",
    failure_message: "Failed to create Vapi token",
    upstream_failure: UpstreamFailureStatus::Mirror,
    surface_upstream_message: false,
    include_details: true,
    include_transport_details: true,
};

pub const CONTACT_ENDPOINT: Endpoint = Endpoint {
    name: "submit_contact",
    failure_message: "Failed to submit form. Please try again.",
    upstream_failure: UpstreamFailureStatus::InternalServerError,
    surface_upstream_message: true,
    include_details: true,
    include_transport_details: false,
};

impl Endpoint {
    pub fn status_for(&self, e: &RelayError) -> StatusCode {
        match e {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Upstream { status, .. } => match self.upstream_failure {
                UpstreamFailureStatus::Ok => StatusCode::OK,
                UpstreamFailureStatus::Mirror => *status,
                UpstreamFailureStatus::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            },
            RelayError::Transport { .. } | RelayError::MalformedReply { .. } => {
                match self.upstream_failure {
                    UpstreamFailureStatus::Ok => StatusCode::OK,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                }
            }
        }
    }

    pub fn failure(&self, e: RelayError) -> Failure {
        let (error, details) = match e {
            RelayError::Validation(msg) | RelayError::Configuration(msg) => (msg.to_string(), None),
            RelayError::Upstream {
                message, details, ..
            } => {
                let error = match message {
                    Some(m) if self.surface_upstream_message => m,
                    _ => self.failure_message.to_string(),
                };
                (error, Some(details))
            }
            e @ (RelayError::Transport { .. } | RelayError::MalformedReply { .. }) => (
                self.failure_message.to_string(),
                self.include_transport_details.then(|| Value::String(e.to_string())),
            ),
        };
        Failure {
            error,
            details: details.filter(|_| self.include_details),
        }
    }

    /// Turn a relay outcome into the JSON envelope, scrubbing credentials from failures.
    pub fn respond<T: Serialize>(
        &self,
        app_state: &AppState,
        result: Result<T, RelayError>,
    ) -> Response {
        match result {
            Ok(body) => (StatusCode::OK, Json(Envelope::success(body))).into_response(),
            Err(e) => {
                handle_error(self.name, &e);
                let status = self.status_for(&e);
                let mut failure = self.failure(e);
                redact_failure(&mut failure, &app_state.config.secrets());
                (status, Json(Envelope::failure(failure))).into_response()
            }
        }
    }
}

#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn initiate_call_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<CallRequest>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(request)) => relays::initiate_call(&app_state, request).await,
        Err(rejection) => Err(rejection.into()),
    };
    CALL_ENDPOINT.respond(&app_state, result)
}

#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn issue_token_handler(State(app_state): State<Arc<AppState>>) -> Response {
    let result = relays::issue_token(&app_state).await;
    TOKEN_ENDPOINT.respond(&app_state, result)
}

#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn submit_contact_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(request)) => relays::submit_contact(&app_state, request).await,
        Err(rejection) => Err(rejection.into()),
    };
    CONTACT_ENDPOINT.respond(&app_state, result)
}

pub async fn scenarios_handler() -> impl IntoResponse {
    Json(Envelope::success(ScenarioCatalog {
        scenarios: DEMO_SCENARIOS,
    }))
}

/// OPTIONS without CORS preflight headers.  Real preflights are answered by the CORS layer.
pub async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST, OPTIONS")],
        Json(Envelope::failure(Failure {
            error: "Method not allowed".to_string(),
            details: None,
        })),
    )
}

fn relay_route(route: MethodRouter<Arc<AppState>>) -> MethodRouter<Arc<AppState>> {
    route
        .options(preflight_handler)
        .fallback(method_not_allowed)
}

pub fn router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(
            "/api/functions/initiateVapiCall",
            relay_route(post(initiate_call_handler)),
        )
        .route("/api/vapi-token", relay_route(post(issue_token_handler)))
        .route("/api/contact", relay_route(post(submit_contact_handler)))
        .route("/api/scenarios", get(scenarios_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
