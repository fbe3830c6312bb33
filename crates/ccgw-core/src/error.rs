use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use ccgw_credential::CredentialError;
use ccgw_upstream::UpstreamError;

/// The full error taxonomy of spec §7, converted to the JSON envelope of
/// spec §6 ("Errors to clients") by a single `IntoResponse` impl.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid inbound credentials")]
    InboundAuth,

    #[error("no valid credentials available in the rotation pool")]
    NoCredentialsAvailable,

    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("upstream response missing {0}")]
    MalformedUpstreamContent(&'static str),

    #[error("invalid request: {0}")]
    AdapterValidation(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<CredentialError> for GatewayError {
    fn from(value: CredentialError) -> Self {
        match value {
            CredentialError::NoCredentialsAvailable => GatewayError::NoCredentialsAvailable,
            CredentialError::MalformedUpstreamContent(field) => {
                GatewayError::MalformedUpstreamContent(field)
            }
            CredentialError::RefreshFailure(message)
            | CredentialError::OnboardingFailed(message)
            | CredentialError::Transport(message) => GatewayError::Unexpected(message),
            CredentialError::OnboardingIncomplete { attempts } => {
                // Spec §4.2/§7: not a hard failure — the credential remains
                // usable and a later request retries onboarding. Reaching
                // this arm means a caller surfaced it as an error anyway;
                // report it as an upstream-shaped 502 rather than panicking.
                GatewayError::Unexpected(format!(
                    "onboarding did not complete after {attempts} attempts"
                ))
            }
        }
    }
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::InboundAuth => StatusCode::UNAUTHORIZED,
            GatewayError::NoCredentialsAvailable => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Upstream(UpstreamError::Http { status, .. }) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::MalformedUpstreamContent(_) => StatusCode::BAD_GATEWAY,
            GatewayError::AdapterValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            GatewayError::InboundAuth => "invalid_auth",
            GatewayError::NoCredentialsAvailable => "no_credentials_available",
            GatewayError::Upstream(_) => "upstream_api_error",
            GatewayError::MalformedUpstreamContent(_) => "malformed_upstream_content",
            GatewayError::AdapterValidation(_) => "invalid_request_error",
            GatewayError::Unexpected(_) => "unexpected_error",
        }
    }

    /// The inline SSE error frame body used when a failure happens after
    /// stream headers are already sent (spec §6 "Streaming errors").
    pub fn to_stream_frame(&self) -> serde_json::Value {
        json!({ "error": { "message": self.to_string(), "type": self.error_type() } })
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "error": {
                "message": self.to_string(),
                "type": self.error_type(),
            }
        });
        if let GatewayError::Upstream(UpstreamError::Http { body: upstream_body, .. }) = &self {
            body["error"]["detail"] = upstream_body.clone();
        }
        if let GatewayError::Unexpected(detail) = &self {
            body["error"]["detail"] = json!(detail);
        }

        let mut response = (status, Json(body)).into_response();
        if matches!(self, GatewayError::InboundAuth) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Basic"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_credentials_maps_to_503() {
        assert_eq!(GatewayError::NoCredentialsAvailable.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn upstream_http_error_mirrors_upstream_status() {
        let err = GatewayError::Upstream(UpstreamError::Http { status: 429, body: json!({}) });
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.error_type(), "upstream_api_error");
    }

    #[test]
    fn adapter_validation_maps_to_422() {
        assert_eq!(
            GatewayError::AdapterValidation("bad body".to_string()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn unexpected_error_envelope_carries_detail() {
        let response = GatewayError::Unexpected("pool lock poisoned".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"]["type"], "unexpected_error");
        assert_eq!(value["error"]["detail"], "pool lock poisoned");
    }
}
