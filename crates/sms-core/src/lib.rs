//! # SMS Core
//!
//! Core traits and types for the smsalert gateway.
//!
//! This crate provides the building blocks shared by the provider and web crates:
//! - [`SmsClient`] trait for sending SMS messages
//! - [`AlertSettings`], the read-only settings the alert endpoint runs against
//! - Request, outcome and error types, plus the framework-agnostic [`AlertResponse`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use sms_core::{SendRequest, SenderRoute, SmsClient};
//!
//! // Any SMS provider implements SmsClient
//! let outcome = client.send(SendRequest {
//!     to: "+1234567890",
//!     body: "Disk almost full",
//!     route: SenderRoute::From("+0987654321"),
//! }).await?;
//! ```

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Header the caller puts the admin key in.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Longest message the endpoint accepts, in characters.
pub const MAX_MESSAGE_CHARS: usize = 160;

/// Errors caused by the caller. Never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Provide 1–160 ASCII chars (no emoji)")]
    InvalidMessage,
}

/// Required server-side settings are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Twilio credentials not configured")]
    MissingCredentials,
    #[error("TO_NUMBER env var not set (destination phone)")]
    MissingDestination,
    #[error("Missing TWILIO_MESSAGING_SERVICE_SID or TWILIO_FROM")]
    MissingSender,
}

/// The delivery provider rejected the message or could not be reached.
///
/// `code` and `message` are passed through to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    /// Provider error code, e.g. Twilio's `21211`. Absent for transport failures.
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Failure below the provider API (DNS, TLS, connection reset, ...).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

/// Everything that can end an alert request early.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Send failed")]
    Provider(#[from] ProviderError),
}

impl AlertError {
    pub fn status(&self) -> HttpStatus {
        match self {
            AlertError::Client(ClientError::MethodNotAllowed) => HttpStatus::MethodNotAllowed,
            AlertError::Client(ClientError::Unauthorized) => HttpStatus::Unauthorized,
            AlertError::Client(ClientError::InvalidMessage) => HttpStatus::BadRequest,
            AlertError::Configuration(_) | AlertError::Provider(_) => {
                HttpStatus::InternalServerError
            }
        }
    }
}

/// HTTP status code for web responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok = 200,
    BadRequest = 400,
    Unauthorized = 401,
    MethodNotAllowed = 405,
    InternalServerError = 500,
}

impl HttpStatus {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// How the provider picks the sending number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SenderRoute<'a> {
    /// Provider-side messaging service; the provider chooses the number.
    MessagingService(&'a str),
    /// A fixed sender number.
    From(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SendRequest<'a> {
    pub to: &'a str,
    pub body: &'a str,
    pub route: SenderRoute<'a>,
}

/// What the provider reports after accepting a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    /// Provider-assigned message id (Twilio `sid`).
    pub sid: String,
    /// Provider status string, e.g. `queued`.
    pub status: String,
}

#[async_trait]
pub trait SmsClient: Send + Sync {
    /// Send a single text SMS. Called at most once per alert request, never retried.
    async fn send(&self, req: SendRequest<'_>) -> Result<DeliveryOutcome, ProviderError>;
}

/// Utility to create a pseudo id if a provider doesn't return one.
pub fn fallback_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lightweight header representation to avoid tying the core to any HTTP framework.
pub type Headers = Vec<(String, String)>;

/// First value of `name` in `headers`, compared case-insensitively.
pub fn header_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Settings the alert endpoint runs against.
///
/// Built once at start-up and shared read-only between requests. Every field is
/// optional so that a missing value surfaces as a per-request error rather than
/// a start-up failure; an empty string counts as unset.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    pub admin_api_key: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_messaging_service_sid: Option<String>,
    pub twilio_from: Option<String>,
    pub to_number: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl AlertSettings {
    /// Admin key callers must present. `None` means nobody is authorized.
    pub fn admin_key(&self) -> Option<&str> {
        present(&self.admin_api_key)
    }

    /// Account SID and auth token.
    pub fn credentials(&self) -> Result<(&str, &str), ConfigurationError> {
        match (
            present(&self.twilio_account_sid),
            present(&self.twilio_auth_token),
        ) {
            (Some(sid), Some(token)) => Ok((sid, token)),
            _ => Err(ConfigurationError::MissingCredentials),
        }
    }

    pub fn destination(&self) -> Result<&str, ConfigurationError> {
        present(&self.to_number).ok_or(ConfigurationError::MissingDestination)
    }

    /// Messaging service first, then the fixed sender number.
    pub fn sender_route(&self) -> Result<SenderRoute<'_>, ConfigurationError> {
        if let Some(sid) = present(&self.twilio_messaging_service_sid) {
            Ok(SenderRoute::MessagingService(sid))
        } else if let Some(from) = present(&self.twilio_from) {
            Ok(SenderRoute::From(from))
        } else {
            Err(ConfigurationError::MissingSender)
        }
    }
}

impl fmt::Debug for AlertSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| present(v).map(|_| "<redacted>");
        f.debug_struct("AlertSettings")
            .field("admin_api_key", &redact(&self.admin_api_key))
            .field("twilio_account_sid", &self.twilio_account_sid)
            .field("twilio_auth_token", &redact(&self.twilio_auth_token))
            .field(
                "twilio_messaging_service_sid",
                &self.twilio_messaging_service_sid,
            )
            .field("twilio_from", &self.twilio_from)
            .field("to_number", &self.to_number)
            .finish()
    }
}

/// Generic response that can be converted to any framework's response type
#[derive(Debug, Clone)]
pub struct AlertResponse {
    pub status: HttpStatus,
    pub body: String,
    pub content_type: String,
}

impl AlertResponse {
    pub fn success(outcome: &DeliveryOutcome) -> Self {
        Self::json(
            HttpStatus::Ok,
            json!({ "ok": true, "messageSid": outcome.sid, "status": outcome.status }),
        )
    }

    pub fn error(status: HttpStatus, message: &str) -> Self {
        Self::json(status, json!({ "error": message }))
    }

    /// 500 carrying the provider's own code and message.
    pub fn send_failed(err: &ProviderError) -> Self {
        let mut body = json!({ "error": "Send failed", "message": err.message });
        if let Some(code) = err.code {
            body["code"] = json!(code);
        }
        Self::json(HttpStatus::InternalServerError, body)
    }

    fn json(status: HttpStatus, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            content_type: "application/json".to_string(),
        }
    }
}
