use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderMap, Method, StatusCode, header},
    response::IntoResponse,
    routing::{any, get},
};
use bytes::Bytes;
use sms_core::Headers;
use sms_web_generic::{
    AlertProcessor, AlertRequest, HeaderConverter, RequestBody, ResponseConverter,
};

/// Path of the send endpoint.
pub const SEND_ALERT_PATH: &str = "/api/alerts/send";

/// Largest body buffered for the send endpoint. Anything bigger is read as empty.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub processor: AlertProcessor,
}

/// Axum-specific header converter
pub struct AxumHeaderConverter;

impl HeaderConverter for AxumHeaderConverter {
    type HeaderType = HeaderMap;

    fn to_generic_headers(headers: &Self::HeaderType) -> Headers {
        headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

/// Axum-specific response converter
pub struct AxumResponseConverter;

impl ResponseConverter for AxumResponseConverter {
    type ResponseType = axum::response::Response;

    fn from_alert_response(response: sms_core::AlertResponse) -> Self::ResponseType {
        let status = StatusCode::from_u16(response.status.as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (
            status,
            [(header::CONTENT_TYPE, response.content_type)],
            response.body,
        )
            .into_response()
    }
}

/// Send handler: any method on `/api/alerts/send`; non-POST is rejected by the processor.
pub async fn send_alert(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> impl IntoResponse {
    // Oversized or unreadable bodies still go through the method and key checks,
    // then fail message validation.
    let body: Bytes = to_bytes(body, MAX_BODY_BYTES).await.unwrap_or_default();
    let request = AlertRequest {
        method: method.as_str(),
        headers: AxumHeaderConverter::to_generic_headers(&headers),
        body: RequestBody::Raw(&body),
    };
    let response = state.processor.process(request).await;
    AxumResponseConverter::from_alert_response(response)
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(SEND_ALERT_PATH, any(send_alert))
        .route("/health", get(health))
        .with_state(state)
}
