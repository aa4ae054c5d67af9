use crate::config::Config;
use crate::error::RelayError;
use crate::upstream::Upstream;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn vapi(&self) -> Result<Upstream<'_>, RelayError> {
        let key = self
            .config
            .vapi_api_key
            .as_ref()
            .ok_or(RelayError::Configuration("Vapi API key not configured"))?;
        Ok(Upstream::new(
            "vapi",
            &self.http_client,
            &self.config.vapi_base_url,
            key,
        ))
    }

    pub fn resend(&self) -> Result<Upstream<'_>, RelayError> {
        let key = self
            .config
            .resend_api_key
            .as_ref()
            .ok_or(RelayError::Configuration("Email service not configured"))?;
        if self.config.contact_recipients.is_empty() {
            return Err(RelayError::Configuration("No notification recipients configured"));
        }
        Ok(Upstream::new(
            "resend",
            &self.http_client,
            &self.config.resend_base_url,
            key,
        ))
    }

    /// The record store together with its base id, or `None` when persistence is switched off.
    /// Half a configuration (key without base, or base without key) is an error.
    pub fn airtable(&self) -> Result<Option<(Upstream<'_>, &str)>, RelayError> {
        let airtable = &self.config.airtable;
        match (airtable.api_key.as_ref(), airtable.base_id.as_deref()) {
            (Some(key), Some(base_id)) => Ok(Some((
                Upstream::new("airtable", &self.http_client, &airtable.base_url, key),
                base_id,
            ))),
            (None, None) => Ok(None),
            _ => Err(RelayError::Configuration("Record store not configured")),
        }
    }
}

/// Inbound body of the call relay.  Fields are optional here so that absence becomes a
/// validation error rather than a deserialization failure.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default)]
    pub scenario_name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A contact request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub company: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallStarted {
    pub call_id: String,
    pub message: String,
}

/// Token relay success payload: the provider's JSON object, passed through.
pub type TokenIssued = Map<String, Value>;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ContactSubmitted {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Failure {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// The `{success, ...}` shape every endpoint answers with.  Payload fields are flattened next to
/// `success`, so a failure never carries success fields and vice versa.
#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Envelope<T> {
    pub fn success(body: T) -> Self {
        Self {
            success: true,
            body,
        }
    }
}

impl Envelope<Failure> {
    pub fn failure(failure: Failure) -> Self {
        Self {
            success: false,
            body: failure,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct DemoScenario {
    pub id: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub assistant_id: &'static str,
}

#[derive(Serialize, Debug)]
pub struct ScenarioCatalog {
    pub scenarios: &'static [DemoScenario],
}

pub const DEMO_SCENARIOS: &[DemoScenario] = &[
    DemoScenario {
        id: 1,
        title: "Restaurant",
        description: "Make a dinner reservation",
        assistant_id: "9a89b82b-ba64-4a8a-8a20-50a869a4852e",
    },
    DemoScenario {
        id: 2,
        title: "Hair Salon",
        description: "Book a haircut appointment",
        assistant_id: "62001a29-6981-47da-873d-33cd0516f9c3",
    },
    DemoScenario {
        id: 3,
        title: "Photographer",
        description: "Schedule a photo session",
        assistant_id: "d4dd1fe0-d6f9-4019-bdac-ebd08af12829",
    },
    DemoScenario {
        id: 4,
        title: "Coffee Shop",
        description: "Place a pickup order",
        assistant_id: "93027f68-3557-418e-92c3-5cd24833af22",
    },
];
