//! # Twilio SMS Provider
//!
//! Sends messages through the Twilio Messages REST API.
//!
//! ```rust,ignore
//! use sms_core::{SendRequest, SenderRoute, SmsClient};
//! use sms_twilio::TwilioClient;
//!
//! let client = TwilioClient::new("AC...", "auth_token");
//! let outcome = client.send(SendRequest {
//!     to: "+1234567890",
//!     body: "Backup finished",
//!     route: SenderRoute::MessagingService("MG..."),
//! }).await?;
//! println!("{} is {}", outcome.sid, outcome.status);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sms_core::{DeliveryOutcome, ProviderError, SendRequest, SenderRoute, SmsClient};
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

/// Twilio REST client.
#[derive(Clone)]
pub struct TwilioClient {
    /// Twilio Account SID, also the basic-auth user name.
    pub account_sid: String,
    auth_token: String,
    /// API base URL; override for testing/mocking.
    pub base_url: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioClient")
            .field("account_sid", &self.account_sid)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TwilioClient {
    pub fn new<S: Into<String>>(account_sid: S, auth_token: S) -> Self {
        Self::with_base_url(account_sid, auth_token, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url<S: Into<String>>(account_sid: S, auth_token: S, base_url: String) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            base_url,
            http: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.account_sid
        )
    }
}

/// Form body of `POST /Messages.json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TwilioSendRequest<'a> {
    to: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    messaging_service_sid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
}

impl<'a> From<SendRequest<'a>> for TwilioSendRequest<'a> {
    fn from(req: SendRequest<'a>) -> Self {
        let (messaging_service_sid, from) = match req.route {
            SenderRoute::MessagingService(sid) => (Some(sid), None),
            SenderRoute::From(from) => (None, Some(from)),
        };
        Self {
            to: req.to,
            body: req.body,
            messaging_service_sid,
            from,
        }
    }
}

/// Twilio's error document, e.g. `{"code": 21211, "message": "Invalid 'To' Phone Number", ...}`.
#[derive(Debug, Deserialize)]
struct TwilioErrorResponse {
    code: Option<i64>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    more_info: Option<String>,
}

impl From<TwilioErrorResponse> for ProviderError {
    fn from(e: TwilioErrorResponse) -> Self {
        ProviderError::new(e.code, e.message)
    }
}

#[async_trait]
impl SmsClient for TwilioClient {
    async fn send(&self, req: SendRequest<'_>) -> Result<DeliveryOutcome, ProviderError> {
        debug!(to = req.to, route = ?req.route, "sending SMS via Twilio");

        let payload = TwilioSendRequest::from(req);
        let res = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))?;

        let status = res.status();
        let raw_text = res
            .text()
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<TwilioErrorResponse>(&raw_text) {
                Ok(err) => {
                    warn!(
                        http_status = status.as_u16(),
                        code = ?err.code,
                        more_info = ?err.more_info,
                        "Twilio rejected message"
                    );
                    err.into()
                }
                Err(_) => {
                    warn!(http_status = status.as_u16(), "Twilio returned a non-JSON error");
                    ProviderError::transport(format!("HTTP {}: {}", status, raw_text))
                }
            });
        }

        let raw_json: serde_json::Value = serde_json::from_str(&raw_text)
            .unwrap_or_else(|_| serde_json::json!({ "raw": raw_text }));

        let sid = raw_json
            .get("sid")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(sms_core::fallback_id);
        let status = raw_json
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        debug!(sid = %sid, status = %status, "Twilio accepted message");
        Ok(DeliveryOutcome { sid, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MESSAGES_PATH: &str = "/2010-04-01/Accounts/AC123/Messages.json";

    fn client(server: &MockServer) -> TwilioClient {
        TwilioClient::with_base_url("AC123", "token", server.uri())
    }

    #[test]
    fn form_uses_messaging_service_when_routed_through_it() {
        let form = encoded_form(SendRequest {
            to: "+15550002222",
            body: "hi",
            route: SenderRoute::MessagingService("MG1"),
        });
        assert!(form.contains("MessagingServiceSid=MG1"));
        assert!(!form.contains("From="));
        assert!(form.contains("To=%2B15550002222"));
    }

    #[test]
    fn form_uses_from_address() {
        let form = encoded_form(SendRequest {
            to: "+15550002222",
            body: "hi there",
            route: SenderRoute::From("+15550001111"),
        });
        assert!(form.contains("From=%2B15550001111"));
        assert!(!form.contains("MessagingServiceSid"));
        assert!(form.contains("Body=hi+there"));
    }

    fn encoded_form(req: SendRequest<'_>) -> String {
        let client = reqwest::Client::new();
        let built = client
            .post("http://localhost/")
            .form(&TwilioSendRequest::from(req))
            .build()
            .unwrap();
        String::from_utf8(built.body().unwrap().as_bytes().unwrap().to_vec()).unwrap()
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let c = TwilioClient::with_base_url("AC1", "t", "http://example.test/".into());
        assert_eq!(
            c.messages_url(),
            "http://example.test/2010-04-01/Accounts/AC1/Messages.json"
        );
    }

    #[test]
    fn debug_does_not_print_token() {
        let c = TwilioClient::new("AC1", "very-secret");
        assert!(!format!("{:?}", c).contains("very-secret"));
    }

    #[tokio::test]
    async fn send_returns_sid_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MESSAGES_PATH))
            .and(basic_auth("AC123", "token"))
            .and(body_string_contains("Body=Hello"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "sid": "SM123",
                "status": "queued",
                "to": "+15550002222"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server)
            .send(SendRequest {
                to: "+15550002222",
                body: "Hello",
                route: SenderRoute::From("+15550001111"),
            })
            .await
            .unwrap();

        assert_eq!(outcome.sid, "SM123");
        assert_eq!(outcome.status, "queued");
    }

    #[tokio::test]
    async fn twilio_error_document_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MESSAGES_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": 21211,
                "message": "Invalid 'To' number",
                "more_info": "https://www.twilio.com/docs/errors/21211",
                "status": 400
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .send(SendRequest {
                to: "nope",
                body: "Hello",
                route: SenderRoute::MessagingService("MG1"),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, Some(21211));
        assert_eq!(err.message, "Invalid 'To' number");
    }

    #[tokio::test]
    async fn error_code_survives_missing_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MESSAGES_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "code": 20429,
                "status": 429
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .send(SendRequest {
                to: "+15550002222",
                body: "Hello",
                route: SenderRoute::From("+15550001111"),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, Some(20429));
        assert_eq!(err.message, "");
    }

    #[tokio::test]
    async fn non_json_error_keeps_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client(&server)
            .send(SendRequest {
                to: "+15550002222",
                body: "Hello",
                route: SenderRoute::From("+15550001111"),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, None);
        assert!(err.message.starts_with("HTTP 502"));
        assert!(err.message.contains("bad gateway"));
    }

    #[tokio::test]
    async fn missing_sid_falls_back_to_generated_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .mount(&server)
            .await;

        let outcome = client(&server)
            .send(SendRequest {
                to: "+15550002222",
                body: "Hello",
                route: SenderRoute::From("+15550001111"),
            })
            .await
            .unwrap();

        assert!(!outcome.sid.is_empty());
        assert_eq!(outcome.status, "unknown");
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_transport_error() {
        let c = TwilioClient::with_base_url("AC123", "token", "http://127.0.0.1:1".into());
        let err = c
            .send(SendRequest {
                to: "+15550002222",
                body: "Hello",
                route: SenderRoute::From("+15550001111"),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, None);
        assert!(!err.message.is_empty());
    }
}
