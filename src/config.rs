use reqwest::Url;
use std::net::SocketAddr;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_VAPI_BASE_URL: &str = "https://api.vapi.ai";
pub const DEFAULT_RESEND_BASE_URL: &str = "https://api.resend.com";
pub const DEFAULT_AIRTABLE_BASE_URL: &str = "https://api.airtable.com";
pub const DEFAULT_AIRTABLE_TABLE: &str = "Contact Submissions";
pub const DEFAULT_CONTACT_FROM: &str = "iinfii.ai Contact Form <noreply@iinfii.ai>";
pub const DEFAULT_CONTACT_RECIPIENTS: &[&str] = &["chance@contentdrip.ai", "billy@vasttrack.ai"];

/// A server-held credential.  Never printed by `Debug`; use `expose` only when building the
/// outbound `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value}")]
    BindAddr { var: &'static str, value: String },
    #[error("{var} is not a usable base URL: {value}")]
    BaseUrl { var: &'static str, value: String },
    #[error("{var} names no recipients: {value:?}")]
    Recipients { var: &'static str, value: String },
    #[error("{var} is not a valid log level: {value}")]
    LogLevel { var: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AirtableConfig {
    pub api_key: Option<Secret>,
    pub base_id: Option<String>,
    pub table: String,
    pub base_url: Url,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub log_level: LevelFilter,
    pub vapi_api_key: Option<Secret>,
    pub vapi_base_url: Url,
    pub vapi_phone_number_id: Option<String>,
    pub resend_api_key: Option<Secret>,
    pub resend_base_url: Url,
    pub contact_from: String,
    pub contact_recipients: Vec<String>,
    pub airtable: AirtableConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.  Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr.parse().map_err(|_| ConfigError::BindAddr {
            var: "BIND_ADDR",
            value: bind_addr.clone(),
        })?;

        let log_level = match var("RELAY_LOG_LEVEL") {
            Some(level) => level.parse().map_err(|_| ConfigError::LogLevel {
                var: "RELAY_LOG_LEVEL",
                value: level.clone(),
            })?,
            None => LevelFilter::DEBUG,
        };

        let contact_recipients = match var("CONTACT_RECIPIENTS") {
            Some(list) => {
                let recipients: Vec<String> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(String::from)
                    .collect();
                if recipients.is_empty() {
                    return Err(ConfigError::Recipients {
                        var: "CONTACT_RECIPIENTS",
                        value: list,
                    });
                }
                recipients
            }
            None => DEFAULT_CONTACT_RECIPIENTS
                .iter()
                .map(|r| r.to_string())
                .collect(),
        };

        Ok(Self {
            bind_addr,
            log_level,
            vapi_api_key: var("VAPI_API_KEY")
                .or_else(|| var("VAPI_PRIVATE_KEY"))
                .map(Secret::new),
            vapi_base_url: base_url(&var, "VAPI_BASE_URL", DEFAULT_VAPI_BASE_URL)?,
            vapi_phone_number_id: var("VAPI_PHONE_NUMBER_ID"),
            resend_api_key: var("RESEND_API_KEY").map(Secret::new),
            resend_base_url: base_url(&var, "RESEND_BASE_URL", DEFAULT_RESEND_BASE_URL)?,
            contact_from: var("CONTACT_FROM").unwrap_or_else(|| DEFAULT_CONTACT_FROM.to_string()),
            contact_recipients,
            airtable: AirtableConfig {
                api_key: var("AIRTABLE_API_KEY").map(Secret::new),
                base_id: var("AIRTABLE_BASE_ID"),
                table: var("AIRTABLE_TABLE").unwrap_or_else(|| DEFAULT_AIRTABLE_TABLE.to_string()),
                base_url: base_url(&var, "AIRTABLE_BASE_URL", DEFAULT_AIRTABLE_BASE_URL)?,
            },
        })
    }

    /// Every credential currently configured, for scrubbing outbound text.
    pub fn secrets(&self) -> Vec<&Secret> {
        [
            self.vapi_api_key.as_ref(),
            self.resend_api_key.as_ref(),
            self.airtable.api_key.as_ref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

fn base_url<F>(var: &F, key: &'static str, default: &str) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = var(key).unwrap_or_else(|| default.to_string());
    match Url::parse(&value) {
        Ok(url) if !url.cannot_be_a_base() && matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(ConfigError::BaseUrl { var: key, value }),
    }
}
