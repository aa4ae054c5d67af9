use crate::config::Secret;
use crate::types::{Contact, Failure};

use html_escape::{encode_double_quoted_attribute, encode_text};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const REDACTED: &str = "[REDACTED]";

/// Strip the separators people type into phone fields: spaces, dashes and parentheses.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect()
}

fn e164_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[1-9]\d{1,14}$").expect("valid E.164 regex"))
}

/// E.164 shape: optional `+`, a non-zero leading digit, 2 to 15 digits in total.
pub fn is_e164(number: &str) -> bool {
    e164_re().is_match(number)
}

pub fn notification_subject(contact: &Contact) -> String {
    format!("New Contact: {} from {}", contact.name, contact.company)
}

/// HTML body of the internal notification sent for every contact submission.
pub fn render_notification(contact: &Contact, record_id: Option<&str>) -> String {
    let name = encode_text(&contact.name);
    let email = encode_text(&contact.email);
    let mailto = encode_double_quoted_attribute(&contact.email);
    let company = encode_text(&contact.company);
    let message = if contact.message.is_empty() {
        "No message provided".into()
    } else {
        encode_text(&contact.message)
    };
    let footer = match record_id {
        Some(id) => format!(
            r#"
  <p style="font-size: 12px; color: #6B7280;">This submission has been saved to Airtable (Record ID: {}).</p>"#,
            encode_text(id)
        ),
        None => String::new(),
    };

    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <h2 style="color: #00D48A;">New Contact Form Submission</h2>
  <hr style="border: none; border-top: 2px solid #e0e0e0; margin: 20px 0;">
  <h3 style="color: #1C1C1C;">Contact Details</h3>
  <table style="width: 100%; border-collapse: collapse;">
    <tr><td style="padding: 8px 0; font-weight: bold; width: 120px;">Name:</td><td style="padding: 8px 0;">{name}</td></tr>
    <tr><td style="padding: 8px 0; font-weight: bold;">Email:</td><td style="padding: 8px 0;"><a href="mailto:{mailto}" style="color: #00D48A;">{email}</a></td></tr>
    <tr><td style="padding: 8px 0; font-weight: bold;">Company:</td><td style="padding: 8px 0;">{company}</td></tr>
  </table>
  <hr style="border: none; border-top: 2px solid #e0e0e0; margin: 20px 0;">
  <h3 style="color: #1C1C1C;">Message</h3>
  <div style="background-color: #f9f9f9; padding: 15px; border-radius: 8px; border-left: 4px solid #00D48A;">
    <p style="margin: 0; white-space: pre-wrap;">{message}</p>
  </div>{footer}
</body>
</html>"#
    )
}

pub fn redact_text(text: &mut String, secrets: &[&Secret]) {
    for secret in secrets {
        let value = secret.expose();
        if !value.is_empty() && text.contains(value) {
            *text = text.replace(value, REDACTED);
        }
    }
}

fn redact_value(value: &mut Value, secrets: &[&Secret]) {
    match value {
        Value::String(s) => redact_text(s, secrets),
        Value::Array(items) => items.iter_mut().for_each(|v| redact_value(v, secrets)),
        Value::Object(map) => map.values_mut().for_each(|v| redact_value(v, secrets)),
        _ => (),
    }
}

/// Scrub every configured credential out of a failure before it leaves the process.
pub fn redact_failure(failure: &mut Failure, secrets: &[&Secret]) {
    redact_text(&mut failure.error, secrets);
    if let Some(details) = failure.details.as_mut() {
        redact_value(details, secrets);
    }
}
