use crate::airtable_types::{ContactFields, CreateRecords, CreatedRecords, NewRecord};
use crate::consts::{CALL_STARTED_MESSAGE, CONTACT_SUBMITTED_MESSAGE};
use crate::error::RelayError;
use crate::resend_types::{EmailAccepted, SendEmail};
use crate::types::{
    AppState, CallRequest, CallStarted, Contact, ContactRequest, ContactSubmitted, TokenIssued,
};
use crate::upstream::Upstream;
use crate::utils::{is_e164, normalize_phone, notification_subject, render_notification};
use crate::vapi_types::{CreateClientToken, CreatePhoneCall, VapiCall, VapiCustomer};

use futures_util::future::try_join_all;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, info};

/// Trim a client supplied field, treating blank as absent.
fn required(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, PartialEq, Eq)]
pub struct CallTarget {
    pub number: String,
    pub assistant_id: String,
    pub scenario_name: Option<String>,
}

pub fn validate_call(request: CallRequest) -> Result<CallTarget, RelayError> {
    let (Some(number), Some(assistant_id)) = (
        required(request.phone_number),
        required(request.assistant_id),
    ) else {
        return Err(RelayError::Validation(
            "Phone number and assistant ID are required",
        ));
    };
    let number = normalize_phone(&number);
    if !is_e164(&number) {
        return Err(RelayError::Validation(
            "Please enter a valid phone number (e.g., +1234567890)",
        ));
    }
    Ok(CallTarget {
        number,
        assistant_id,
        scenario_name: required(request.scenario_name),
    })
}

pub fn validate_contact(request: ContactRequest) -> Result<Contact, RelayError> {
    let (Some(name), Some(email), Some(company)) = (
        required(request.name),
        required(request.email),
        required(request.company),
    ) else {
        return Err(RelayError::Validation(
            "Name, email, and company are required",
        ));
    };
    Ok(Contact {
        name,
        email,
        company,
        message: request.message.map(|m| m.trim().to_string()).unwrap_or_default(),
    })
}

/// Ask the voice provider to dial `phoneNumber` with the given assistant.
pub async fn initiate_call(
    app_state: &AppState,
    request: CallRequest,
) -> Result<CallStarted, RelayError> {
    let target = validate_call(request)?;
    let vapi = app_state.vapi()?;

    let payload = CreatePhoneCall {
        assistant_id: target.assistant_id,
        phone_number_id: app_state.config.vapi_phone_number_id.clone(),
        customer: VapiCustomer {
            number: target.number,
        },
    };
    let call: VapiCall = vapi.post_json(&["call", "phone"], &payload).await?;
    info!(
        call_id = %call.id,
        status = ?call.status,
        scenario = target.scenario_name.as_deref().unwrap_or("unspecified"),
        "call initiated"
    );

    Ok(CallStarted {
        call_id: call.id,
        message: CALL_STARTED_MESSAGE.to_string(),
    })
}

/// Mint a short-lived client token for the browser call widget.
pub async fn issue_token(app_state: &AppState) -> Result<TokenIssued, RelayError> {
    let vapi = app_state.vapi()?;
    let mut token: TokenIssued = vapi
        .post_json(&["client_tokens"], &CreateClientToken::default())
        .await?;
    // `success` belongs to the envelope.
    token.remove("success");
    info!("client token issued");
    Ok(token)
}

/// Persist the submission (when a record store is configured), then notify every recipient.
/// Notifications go out concurrently and the submission only succeeds once all are accepted.
pub async fn submit_contact(
    app_state: &AppState,
    request: ContactRequest,
) -> Result<ContactSubmitted, RelayError> {
    let contact = validate_contact(request)?;
    let resend = app_state.resend()?;
    let airtable = app_state.airtable()?;

    let record_id = match airtable {
        Some((airtable, base_id)) => {
            let id = save_contact(&airtable, base_id, &app_state.config.airtable.table, &contact)
                .await?;
            debug!(record_id = %id, "contact saved");
            Some(id)
        }
        None => None,
    };

    let html = render_notification(&contact, record_id.as_deref());
    let subject = notification_subject(&contact);
    let resend = &resend;
    let sends = app_state.config.contact_recipients.iter().map(move |to| {
        let email = SendEmail {
            from: app_state.config.contact_from.clone(),
            to: vec![to.clone()],
            subject: subject.clone(),
            html: html.clone(),
        };
        async move {
            let accepted: EmailAccepted = resend.post_json(&["emails"], &email).await?;
            debug!(email_id = ?accepted.id, "notification accepted");
            Ok::<_, RelayError>(())
        }
    });
    try_join_all(sends).await?;
    info!(
        recipients = app_state.config.contact_recipients.len(),
        "contact submission relayed"
    );

    Ok(ContactSubmitted {
        message: CONTACT_SUBMITTED_MESSAGE.to_string(),
        id: record_id,
    })
}

async fn save_contact(
    airtable: &Upstream<'_>,
    base_id: &str,
    table: &str,
    contact: &Contact,
) -> Result<String, RelayError> {
    let now = OffsetDateTime::now_utc();
    let submitted_at = now
        .format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    let payload = CreateRecords {
        records: vec![NewRecord {
            fields: ContactFields {
                name: contact.name.clone(),
                email: contact.email.clone(),
                company: contact.company.clone(),
                message: contact.message.clone(),
                submitted_at,
            },
        }],
    };
    let created: CreatedRecords = airtable
        .post_json(&["v0", base_id, table], &payload)
        .await?;
    created
        .records
        .into_iter()
        .next()
        .map(|r| r.id)
        .ok_or(RelayError::MalformedReply {
            provider: airtable.provider,
            reason: "no record returned".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state(server: &MockServer, vars: &[(&str, &str)]) -> AppState {
        let mut env: HashMap<String, String> = [
            ("VAPI_BASE_URL", server.uri()),
            ("RESEND_BASE_URL", server.uri()),
            ("AIRTABLE_BASE_URL", server.uri()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        env.extend(vars.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        AppState::new(Config::from_lookup(|key| env.get(key).cloned()).unwrap())
    }

    fn call_request(phone: Option<&str>, assistant: Option<&str>) -> CallRequest {
        CallRequest {
            phone_number: phone.map(String::from),
            assistant_id: assistant.map(String::from),
            scenario_name: Some("Restaurant".into()),
        }
    }

    fn contact_request() -> ContactRequest {
        ContactRequest {
            name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            company: Some("Analytical".into()),
            message: None,
        }
    }

    #[test]
    fn call_validation_requires_both_fields() {
        for request in [
            call_request(None, Some("abc-123")),
            call_request(Some("+15551234567"), None),
            call_request(Some("   "), Some("abc-123")),
        ] {
            assert!(matches!(
                validate_call(request),
                Err(RelayError::Validation(
                    "Phone number and assistant ID are required"
                ))
            ));
        }
    }

    #[test]
    fn call_validation_normalizes_number() {
        let target =
            validate_call(call_request(Some("+1 (555) 123-4567"), Some(" abc-123 "))).unwrap();
        assert_eq!(
            target,
            CallTarget {
                number: "+15551234567".into(),
                assistant_id: "abc-123".into(),
                scenario_name: Some("Restaurant".into()),
            }
        );
        assert!(matches!(
            validate_call(call_request(Some("call me"), Some("abc-123"))),
            Err(RelayError::Validation(_))
        ));
    }

    #[test]
    fn contact_validation_defaults_message() {
        let contact = validate_contact(contact_request()).unwrap();
        assert_eq!(contact.message, "");

        for missing in ["name", "email", "company"] {
            let mut request = contact_request();
            match missing {
                "name" => request.name = None,
                "email" => request.email = Some(String::new()),
                _ => request.company = None,
            }
            assert!(matches!(
                validate_contact(request),
                Err(RelayError::Validation("Name, email, and company are required"))
            ));
        }
    }

    #[tokio::test]
    async fn successful_call_returns_call_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/call/phone"))
            .and(header("authorization", "Bearer vapi-key"))
            .and(body_json(json!({
                "assistantId": "abc-123",
                "customer": {"number": "+15551234567"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "call_789"})))
            .expect(1)
            .mount(&server)
            .await;

        let app_state = state(&server, &[("VAPI_API_KEY", "vapi-key")]);
        let started = initiate_call(&app_state, call_request(Some("+15551234567"), Some("abc-123")))
            .await
            .unwrap();
        assert_eq!(
            started,
            CallStarted {
                call_id: "call_789".into(),
                message: "Call initiated successfully".into(),
            }
        );
    }

    #[tokio::test]
    async fn configured_phone_number_id_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/call/phone"))
            .and(body_json(json!({
                "assistantId": "abc-123",
                "phoneNumberId": "pn_1",
                "customer": {"number": "+15551234567"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "call_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let app_state = state(
            &server,
            &[("VAPI_API_KEY", "vapi-key"), ("VAPI_PHONE_NUMBER_ID", "pn_1")],
        );
        initiate_call(&app_state, call_request(Some("+15551234567"), Some("abc-123")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_credential_skips_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app_state = state(&server, &[]);
        let err = initiate_call(&app_state, call_request(Some("+15551234567"), Some("abc-123")))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Configuration(_)));
        assert!(matches!(
            issue_token(&app_state).await,
            Err(RelayError::Configuration(_))
        ));
        assert!(matches!(
            submit_contact(&app_state, contact_request()).await,
            Err(RelayError::Configuration("Email service not configured"))
        ));
    }

    #[tokio::test]
    async fn failed_call_is_attempted_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/call/phone"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"message": "invalid assistant"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let app_state = state(&server, &[("VAPI_API_KEY", "vapi-key")]);
        let err = initiate_call(&app_state, call_request(Some("+15551234567"), Some("abc-123")))
            .await
            .unwrap_err();
        match err {
            RelayError::Upstream { message, .. } => {
                assert_eq!(message.as_deref(), Some("invalid assistant"))
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn token_payload_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/client_tokens"))
            .and(body_json(json!({})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"token": "tok_1", "expiresAt": 123, "success": "x"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let app_state = state(&server, &[("VAPI_PRIVATE_KEY", "vapi-key")]);
        let token = issue_token(&app_state).await.unwrap();
        assert_eq!(token.get("token"), Some(&json!("tok_1")));
        assert_eq!(token.get("expiresAt"), Some(&json!(123)));
        assert!(token.get("success").is_none());
    }

    #[tokio::test]
    async fn contact_is_saved_then_sent_to_every_recipient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/appBase/Contact%20Submissions"))
            .and(header("authorization", "Bearer pat-key"))
            .and(body_string_contains("\"Name\":\"Ada\""))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"records": [{"id": "rec123", "fields": {}}]})),
            )
            .expect(1)
            .mount(&server)
            .await;
        for recipient in ["chance@contentdrip.ai", "billy@vasttrack.ai"] {
            Mock::given(method("POST"))
                .and(path("/emails"))
                .and(header("authorization", "Bearer re-key"))
                .and(body_string_contains(recipient))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "em_1"})))
                .expect(1)
                .mount(&server)
                .await;
        }

        let app_state = state(
            &server,
            &[
                ("RESEND_API_KEY", "re-key"),
                ("AIRTABLE_API_KEY", "pat-key"),
                ("AIRTABLE_BASE_ID", "appBase"),
            ],
        );
        let submitted = submit_contact(&app_state, contact_request()).await.unwrap();
        assert_eq!(
            submitted,
            ContactSubmitted {
                message: "Form submitted successfully".into(),
                id: Some("rec123".into()),
            }
        );
    }

    #[tokio::test]
    async fn contact_without_record_store_only_notifies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "em_1"})))
            .expect(2)
            .mount(&server)
            .await;

        let app_state = state(&server, &[("RESEND_API_KEY", "re-key")]);
        let submitted = submit_contact(&app_state, contact_request()).await.unwrap();
        assert_eq!(submitted.id, None);
    }

    #[tokio::test]
    async fn empty_recipient_list_is_a_configuration_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "em_1"})))
            .expect(0)
            .mount(&server)
            .await;

        let mut app_state = state(&server, &[("RESEND_API_KEY", "re-key")]);
        app_state.config.contact_recipients.clear();
        assert!(matches!(
            submit_contact(&app_state, contact_request()).await,
            Err(RelayError::Configuration("No notification recipients configured"))
        ));
    }

    #[tokio::test]
    async fn half_configured_record_store_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app_state = state(
            &server,
            &[("RESEND_API_KEY", "re-key"), ("AIRTABLE_API_KEY", "pat-key")],
        );
        assert!(matches!(
            submit_contact(&app_state, contact_request()).await,
            Err(RelayError::Configuration("Record store not configured"))
        ));
    }

    #[tokio::test]
    async fn one_rejected_notification_fails_the_submission() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(body_string_contains("chance@contentdrip.ai"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "em_1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(body_string_contains("billy@vasttrack.ai"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({"message": "invalid from"})),
            )
            .mount(&server)
            .await;

        let app_state = state(&server, &[("RESEND_API_KEY", "re-key")]);
        let err = submit_contact(&app_state, contact_request())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Upstream { .. }));
    }

    #[tokio::test]
    async fn notifications_are_sent_concurrently_and_joined() {
        let server = MockServer::start().await;
        let delay = Duration::from_millis(300);
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "em_1"}))
                    .set_delay(delay),
            )
            .expect(2)
            .mount(&server)
            .await;

        let app_state = state(&server, &[("RESEND_API_KEY", "re-key")]);
        let started = Instant::now();
        submit_contact(&app_state, contact_request()).await.unwrap();
        let elapsed = started.elapsed();

        // Both sends settled before we returned.
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
        assert!(elapsed >= delay);
        // Issued together, not one after the other.
        assert!(elapsed < delay * 2);
    }
}
