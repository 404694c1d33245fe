use std::sync::Arc;

use serde_json::{Map, Value};
use sms_core::{
    ADMIN_KEY_HEADER, AlertError, AlertResponse, AlertSettings, ClientError, DeliveryOutcome,
    Headers, MAX_MESSAGE_CHARS, SendRequest, SmsClient, header_value,
};
use tracing::{error, info, warn};

/// Body of an inbound request, as the framework hands it over.
#[derive(Debug, Clone)]
pub enum RequestBody<'a> {
    /// The framework already decoded the JSON.
    Parsed(Value),
    /// Raw bytes still to be decoded.
    Raw(&'a [u8]),
}

/// One inbound call to the alert endpoint.
#[derive(Debug, Clone)]
pub struct AlertRequest<'a> {
    pub method: &'a str,
    pub headers: Headers,
    pub body: RequestBody<'a>,
}

/// The request body reduced to a JSON object.
///
/// Decoding is deliberately lenient: bytes that are not JSON, or JSON that is
/// not an object, become [`BodyDocument::EmptyFallback`] instead of an error.
/// Such a request then fails message validation like one with no `body` field.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyDocument {
    Parsed(Map<String, Value>),
    EmptyFallback,
}

impl BodyDocument {
    /// Decode raw bytes. An empty body is read as `{}`.
    pub fn parse(raw: &[u8]) -> Self {
        if raw.is_empty() {
            return BodyDocument::Parsed(Map::new());
        }
        match serde_json::from_slice::<Value>(raw) {
            Ok(value) => Self::from_value(value),
            Err(_) => BodyDocument::EmptyFallback,
        }
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => BodyDocument::Parsed(map),
            _ => BodyDocument::EmptyFallback,
        }
    }

    pub fn from_request_body(body: RequestBody<'_>) -> Self {
        match body {
            RequestBody::Parsed(value) => Self::from_value(value),
            RequestBody::Raw(raw) => Self::parse(raw),
        }
    }

    /// The `body` field, or `""` when it is missing or not a string.
    pub fn message_text(&self) -> &str {
        match self {
            BodyDocument::Parsed(map) => map.get("body").and_then(Value::as_str).unwrap_or(""),
            BodyDocument::EmptyFallback => "",
        }
    }
}

/// Accepts 1 to 160 characters, all of them 7-bit ASCII.
pub fn validate_message(text: &str) -> Result<&str, ClientError> {
    let chars = text.chars().count();
    if chars == 0 || chars > MAX_MESSAGE_CHARS || !text.is_ascii() {
        return Err(ClientError::InvalidMessage);
    }
    Ok(text)
}

/// Checks the `x-admin-key` header against the configured key.
///
/// With no key configured every request is rejected.
pub fn authorize(settings: &AlertSettings, headers: &Headers) -> Result<(), ClientError> {
    match (settings.admin_key(), header_value(headers, ADMIN_KEY_HEADER)) {
        (Some(expected), Some(given)) if expected.as_bytes() == given.as_bytes() => Ok(()),
        _ => Err(ClientError::Unauthorized),
    }
}

/// Framework-agnostic processor that runs the alert pipeline
#[derive(Clone)]
pub struct AlertProcessor {
    settings: Arc<AlertSettings>,
    client: Arc<dyn SmsClient>,
}

impl AlertProcessor {
    pub fn new(settings: Arc<AlertSettings>, client: Arc<dyn SmsClient>) -> Self {
        Self { settings, client }
    }

    /// Process an incoming alert request and return a framework-agnostic response
    pub async fn process(&self, req: AlertRequest<'_>) -> AlertResponse {
        match self.process_internal(req).await {
            Ok(outcome) => {
                info!(sid = %outcome.sid, status = %outcome.status, "alert SMS sent");
                AlertResponse::success(&outcome)
            }
            Err(e) => self.error_to_response(e),
        }
    }

    async fn process_internal(&self, req: AlertRequest<'_>) -> Result<DeliveryOutcome, AlertError> {
        if req.method != "POST" {
            return Err(ClientError::MethodNotAllowed.into());
        }

        authorize(&self.settings, &req.headers)?;

        let document = BodyDocument::from_request_body(req.body);
        let text = validate_message(document.message_text())?;

        self.settings.credentials()?;
        let to = self.settings.destination()?;
        let route = self.settings.sender_route()?;

        let outcome = self
            .client
            .send(SendRequest {
                to,
                body: text,
                route,
            })
            .await?;
        Ok(outcome)
    }

    fn error_to_response(&self, error: AlertError) -> AlertResponse {
        let status = error.status();
        match error {
            AlertError::Client(e) => {
                warn!(status = status.as_u16(), "alert request rejected: {}", e);
                AlertResponse::error(status, &e.to_string())
            }
            AlertError::Configuration(e) => {
                error!("alert endpoint misconfigured: {}", e);
                AlertResponse::error(status, &e.to_string())
            }
            AlertError::Provider(e) => {
                warn!(code = ?e.code, "provider send failed: {}", e);
                AlertResponse::send_failed(&e)
            }
        }
    }
}

/// Helper trait for framework adapters to convert headers
pub trait HeaderConverter {
    type HeaderType;

    fn to_generic_headers(headers: &Self::HeaderType) -> Headers;
}

/// Helper trait for framework adapters to convert responses
pub trait ResponseConverter {
    type ResponseType;

    fn from_alert_response(response: AlertResponse) -> Self::ResponseType;
}
