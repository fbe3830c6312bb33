use bytes::Bytes;
use serde_json::Value as JsonValue;

/// Upstream call failures (spec §4.3 "Upstream Client", §7
/// `UpstreamHttpError`). A non-2xx response is always converted here rather
/// than bubbling up a raw transport type, so every caller — generation,
/// counting, embeddings — sees the same shape.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream returned {status}")]
    Http { status: u16, body: JsonValue },

    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("upstream response was not valid JSON: {0}")]
    InvalidJson(String),
}

impl UpstreamError {
    /// Converts a non-2xx response body into the typed error. The body is
    /// parsed as JSON when possible; otherwise the raw text is preserved
    /// under a `raw` key so nothing is silently dropped (spec §4.3 "the
    /// parsed error body (or raw text)").
    pub fn from_response_body(status: u16, raw: Bytes) -> Self {
        let body = serde_json::from_slice::<JsonValue>(&raw)
            .unwrap_or_else(|_| serde_json::json!({ "raw": String::from_utf8_lossy(&raw) }));
        UpstreamError::Http { status, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_body_is_parsed() {
        let err = UpstreamError::from_response_body(
            400,
            Bytes::from_static(br#"{"error":{"message":"bad"}}"#),
        );
        match err {
            UpstreamError::Http { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body["error"]["message"], "bad");
            }
            _ => panic!("expected Http variant"),
        }
    }

    #[test]
    fn non_json_body_falls_back_to_raw_text() {
        let err = UpstreamError::from_response_body(500, Bytes::from_static(b"boom"));
        match err {
            UpstreamError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body["raw"], "boom");
            }
            _ => panic!("expected Http variant"),
        }
    }
}
