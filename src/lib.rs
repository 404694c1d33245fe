//! # SMS Alert
//!
//! A single authenticated HTTP endpoint that forwards a short text message to
//! one fixed phone number through Twilio.
//!
//! ## Request pipeline
//!
//! `POST /api/alerts/send` with header `x-admin-key` and body `{"body": "..."}`:
//!
//! 1. method gate (405)
//! 2. admin key check, fail-closed when no key is configured (401)
//! 3. lenient JSON body decoding
//! 4. 1–160 ASCII characters (400)
//! 5. credentials and destination present (500)
//! 6. messaging service, else sender number (500 when neither)
//! 7. one Twilio call, never retried
//! 8. `{ok, messageSid, status}` or `{error: "Send failed", code, message}`
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use smsalert::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! let app = smsalert::build_app(&config);
//! ```
//!
//! Provider settings come from `ADMIN_API_KEY`, `TWILIO_ACCOUNT_SID`,
//! `TWILIO_AUTH_TOKEN`, `TWILIO_MESSAGING_SERVICE_SID`, `TWILIO_FROM` and
//! `TO_NUMBER`. Server and logging settings use `SMSALERT__SECTION__KEY`.

pub mod config;
pub mod logging;

use std::sync::Arc;

use axum::Router;
use sms_core::{AlertSettings, SmsClient};
use sms_twilio::TwilioClient;
use sms_web_axum::{AppState, router};
use sms_web_generic::AlertProcessor;
use tracing::warn;

pub use crate::config::*;

/// Router wired to the real Twilio client.
pub fn build_app(config: &AppConfig) -> Router {
    warn_on_incomplete_settings(&config.alert);

    // Missing credentials are rejected per request before the client is used.
    let (account_sid, auth_token) = config.alert.credentials().unwrap_or(("", ""));
    let client = TwilioClient::with_base_url(
        account_sid,
        auth_token,
        config.provider.base_url.clone(),
    );
    build_app_with_client(config.alert.clone(), Arc::new(client))
}

/// Router around any [`SmsClient`], e.g. a test double.
pub fn build_app_with_client(settings: AlertSettings, client: Arc<dyn SmsClient>) -> Router {
    let processor = AlertProcessor::new(Arc::new(settings), client);
    router(AppState { processor })
}

fn warn_on_incomplete_settings(settings: &AlertSettings) {
    if settings.admin_key().is_none() {
        warn!("ADMIN_API_KEY is not set; every request will be rejected with 401");
    }
    if let Err(e) = settings.credentials() {
        warn!("{}", e);
    }
    if let Err(e) = settings.destination() {
        warn!("{}", e);
    }
    if let Err(e) = settings.sender_route() {
        warn!("{}", e);
    }
}

/// Common imports for SMS Alert usage
pub mod prelude {
    pub use crate::config::{AppConfig, LoggingConfig, ProviderConfig, ServerConfig};
    pub use crate::{build_app, build_app_with_client};
    pub use sms_core::*;
    pub use sms_twilio::TwilioClient;
    pub use sms_web_generic::{AlertProcessor, AlertRequest, BodyDocument, RequestBody};
}
