use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::GatewayError;
use crate::state::AppState;
use std::sync::Arc;

/// Extracts the shared password from any of the accepted locations (spec
/// §6 "Inbound authentication"), in the order the spec lists them.
pub fn extract_password(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    if let Some(key) = query_param(query, "key") {
        return Some(key);
    }
    if let Some(key) = header_value(headers, "x-goog-api-key") {
        return Some(key);
    }
    if let Some(key) = header_value(headers, "x-api-key") {
        return Some(key);
    }
    if let Some(authorization) = header_value(headers, "authorization") {
        let trimmed = authorization.trim();
        if let Some(token) = trimmed.strip_prefix("Bearer ").or_else(|| trimmed.strip_prefix("bearer ")) {
            return Some(token.trim().to_string());
        }
        if let Some(encoded) = trimmed.strip_prefix("Basic ").or_else(|| trimmed.strip_prefix("basic ")) {
            if let Ok(decoded) = BASE64.decode(encoded.trim()) {
                if let Ok(text) = String::from_utf8(decoded) {
                    // `user:<password>` — only the password half is checked.
                    if let Some((_, password)) = text.split_once(':') {
                        return Some(password.to_string());
                    }
                }
            }
        }
    }
    None
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
}

fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == name { Some(value.to_string()) } else { None }
    })
}

/// Axum middleware implementing the Auth Gate (spec §4.7, §6). Rejects with
/// 401 + `WWW-Authenticate: Basic` on any mismatch; never distinguishes
/// "missing" from "wrong" in the response, per spec.
pub async fn auth_gate(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, GatewayError> {
    let headers = request.headers().clone();
    let query = request.uri().query().map(str::to_string);
    let provided = extract_password(&headers, query.as_deref());

    match provided {
        Some(password) if password == state.config.auth_password => Ok(next.run(request).await),
        _ => Err(GatewayError::InboundAuth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn query_key_takes_priority() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("header-pwd"));
        let found = extract_password(&headers, Some("key=query-pwd"));
        assert_eq!(found.as_deref(), Some("query-pwd"));
    }

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
        assert_eq!(extract_password(&headers, None).as_deref(), Some("secret"));
    }

    #[test]
    fn basic_auth_password_half_is_extracted() {
        let mut headers = HeaderMap::new();
        let encoded = BASE64.encode("anyuser:secret");
        let value = format!("Basic {encoded}");
        headers.insert("authorization", HeaderValue::from_str(&value).unwrap());
        assert_eq!(extract_password(&headers, None).as_deref(), Some("secret"));
    }

    #[test]
    fn no_credentials_supplied_yields_none() {
        assert!(extract_password(&HeaderMap::new(), None).is_none());
    }
}
