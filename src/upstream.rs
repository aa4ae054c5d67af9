use crate::config::Secret;
use crate::error::RelayError;

use reqwest::Url;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

/// One external provider reached with a bearer credential.
pub struct Upstream<'a> {
    pub provider: &'static str,
    client: &'a reqwest::Client,
    base_url: &'a Url,
    credential: &'a Secret,
}

impl<'a> Upstream<'a> {
    pub fn new(
        provider: &'static str,
        client: &'a reqwest::Client,
        base_url: &'a Url,
        credential: &'a Secret,
    ) -> Self {
        Self {
            provider,
            client,
            base_url,
            credential,
        }
    }

    /// Base URL with `segments` appended, each percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, RelayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RelayError::Configuration("Upstream base URL cannot take a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issue exactly one JSON POST and decode a successful reply as `R`.  There is no retry: a
    /// failed attempt is reported to the caller as is.
    pub async fn post_json<B, R>(&self, segments: &[&str], body: &B) -> Result<R, RelayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        trace!(provider = self.provider, url = %url, "calling upstream");
        let resp = self
            .client
            .post(url)
            .bearer_auth(self.credential.expose())
            .json(body)
            .send()
            .await
            .map_err(|source| RelayError::Transport {
                provider: self.provider,
                source,
            })?;

        let status = resp.status();
        let raw = resp.text().await.map_err(|source| RelayError::Transport {
            provider: self.provider,
            source,
        })?;
        let payload = serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw));
        debug!(provider = self.provider, status = %status, "upstream replied");

        if !status.is_success() {
            return Err(RelayError::Upstream {
                provider: self.provider,
                status,
                message: upstream_message(&payload),
                details: payload,
            });
        }

        serde_json::from_value(payload).map_err(|e| RelayError::MalformedReply {
            provider: self.provider,
            reason: e.to_string(),
        })
    }
}

/// Pull a human readable message out of a provider error payload.  Providers disagree on the
/// shape: `{message}`, `{error: {message}}` and `{error: "CODE"}` all occur.
pub fn upstream_message(payload: &Value) -> Option<String> {
    let message = payload
        .get("message")
        .or_else(|| payload.get("error").and_then(|e| e.get("message")))
        .or_else(|| payload.get("error"))?;
    match message {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}
