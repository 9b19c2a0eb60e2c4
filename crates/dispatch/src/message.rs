use intake::format::{escape_html, format_form_data};
use intake::store::SELF_KEY;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::config::DispatchConfig;
use crate::mail::MailError;

pub const OPERATOR_SUBJECT: &str = "New Service Request";
pub const SUBMITTER_SUBJECT: &str = "Service Request Received";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum MessageBody {
    Text(String),
    Html(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    pub subject: String,
    pub body: MessageBody,
}

/// Look up a dotted path in the snapshot and return it as a non-blank address.
pub fn resolve_recipient(snapshot: &JsonValue, path: &str) -> Option<String> {
    let mut current = snapshot;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    if let JsonValue::Object(map) = current {
        current = map.get(SELF_KEY)?;
    }
    let address = current.as_str()?.trim();
    (!address.is_empty()).then(|| address.to_string())
}

/// Operator copy first, then the submitter copy.
pub fn build_messages(
    snapshot: &JsonValue,
    config: &DispatchConfig,
) -> Result<[OutgoingMessage; 2], MailError> {
    let recipient = resolve_recipient(snapshot, &config.recipient_path)
        .ok_or_else(|| MailError::MissingRecipient(config.recipient_path.clone()))?;
    let details = format_form_data(snapshot);

    let operator = OutgoingMessage {
        from: config.from_address.clone(),
        to: config.operator_address.clone(),
        cc: None,
        subject: OPERATOR_SUBJECT.to_string(),
        body: MessageBody::Text(details.clone()),
    };
    let submitter = OutgoingMessage {
        from: config.from_address.clone(),
        to: recipient,
        cc: Some(config.operator_address.clone()),
        subject: SUBMITTER_SUBJECT.to_string(),
        body: MessageBody::Html(format!(
            "<h1>Service Request Received</h1>\n\
             <p>Your request has been received and is being reviewed.</p>\n\
             <h2>Details you provided:</h2>\n\
             <pre>{}</pre>\n\
             <p>Thank you for your request.</p>\n",
            escape_html(&details)
        )),
    };
    Ok([operator, submitter])
}
