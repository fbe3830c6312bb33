use axum::Json;
use axum::response::{IntoResponse, Response};
use serde_json::Value as JsonValue;

use crate::error::GatewayError;
use crate::redact::log_body;
use crate::state::AppState;

/// The handful of Code Assist-backed models this gateway advertises.
/// Mirrors the shape of `GET /v1beta/models`'s upstream `models.json`, kept
/// as a small literal list here since nothing downstream queries Google for
/// the live catalogue (spec §4.7 "Model service").
const SUPPORTED_MODELS: &[&str] = &[
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
];

/// `countTokens` wraps the inbound payload as `{request:{model, …}}` rather
/// than the `{model, project, request}` shape chat completions use (spec
/// §4.7). Still needs a ready credential: the access token is bearer auth
/// for the call, even though the project ID never appears in the body.
pub async fn count_tokens(
    state: &AppState,
    model: &str,
    payload: JsonValue,
) -> Result<Response, GatewayError> {
    log_body(&state.config, "native.count_tokens.request", &payload);
    let (access_token, _project_id) = state.acquire_credential().await?;

    let mut request_body = match payload {
        JsonValue::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    request_body.insert("model".to_string(), JsonValue::String(model.to_string()));
    let wrapped = serde_json::json!({ "request": JsonValue::Object(request_body) });

    let raw = state.code_assist.post_json(&access_token, "countTokens", &wrapped).await?;
    Ok(Json(raw).into_response())
}

/// `GET /v1/models`, OpenAI-flavoured.
pub fn openai_model_list() -> Response {
    let data: Vec<JsonValue> = SUPPORTED_MODELS
        .iter()
        .map(|id| serde_json::json!({ "id": id, "object": "model", "owned_by": "google" }))
        .collect();
    Json(serde_json::json!({ "object": "list", "data": data })).into_response()
}

/// `GET /v1beta/models`, native Gemini-flavoured.
pub fn gemini_model_list() -> Response {
    let models: Vec<JsonValue> = SUPPORTED_MODELS
        .iter()
        .map(|id| serde_json::json!({ "name": format!("models/{id}"), "supportedGenerationMethods": ["generateContent", "streamGenerateContent"] }))
        .collect();
    Json(serde_json::json!({ "models": models })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_catalogue_is_not_empty() {
        assert!(!SUPPORTED_MODELS.is_empty());
    }
}
