use axum::Json;
use axum::response::{IntoResponse, Response};
use ccgw_protocol::openai::CreateEmbeddingRequest;
use ccgw_transform::embeddings::{EmbeddingUpstreamCall, build_response, transform_request};
use serde_json::Value as JsonValue;

use crate::error::GatewayError;
use crate::redact::log_body;
use crate::state::AppState;

fn extract_single_values(raw: &JsonValue) -> Result<Vec<f64>, GatewayError> {
    raw.get("embedding")
        .and_then(|embedding| embedding.get("values"))
        .and_then(JsonValue::as_array)
        .map(|values| values.iter().filter_map(JsonValue::as_f64).collect())
        .ok_or(GatewayError::MalformedUpstreamContent("embedding.values"))
}

fn extract_batch_values(raw: &JsonValue) -> Result<Vec<Vec<f64>>, GatewayError> {
    let items = raw
        .get("embeddings")
        .and_then(JsonValue::as_array)
        .ok_or(GatewayError::MalformedUpstreamContent("embeddings"))?;
    items
        .iter()
        .map(|item| {
            item.get("values")
                .and_then(JsonValue::as_array)
                .map(|values| values.iter().filter_map(JsonValue::as_f64).collect())
                .ok_or(GatewayError::MalformedUpstreamContent("embeddings[].values"))
        })
        .collect()
}

/// OpenAI `/v1/embeddings`: configured-API-key path against the public
/// endpoint, no credential rotation (spec §4.7 "Embedding service").
pub async fn openai_embeddings(
    state: &AppState,
    request: CreateEmbeddingRequest,
) -> Result<Response, GatewayError> {
    log_body(&state.config, "openai.embeddings.request", &request);
    match transform_request(&request) {
        EmbeddingUpstreamCall::EmbedContent { model, body } => {
            let raw = state.public_gemini.embed(&model, "embedContent", &body).await?;
            let values = extract_single_values(&raw)?;
            Ok(Json(build_response(&model, vec![values])).into_response())
        }
        EmbeddingUpstreamCall::BatchEmbedContents { model, body } => {
            let raw = state.public_gemini.embed(&model, "batchEmbedContents", &body).await?;
            let values = extract_batch_values(&raw)?;
            Ok(Json(build_response(&model, values)).into_response())
        }
    }
}

/// Native `:embedContent` — the request body is already the upstream shape,
/// and the upstream response is returned verbatim.
pub async fn native_embed_content(
    state: &AppState,
    model: &str,
    body: JsonValue,
) -> Result<Response, GatewayError> {
    log_body(&state.config, "native.embed_content.request", &body);
    let raw = state.public_gemini.embed(model, "embedContent", &body).await?;
    Ok(Json(raw).into_response())
}

/// Native `:batchEmbedContents` — same passthrough as `native_embed_content`.
pub async fn native_batch_embed_contents(
    state: &AppState,
    model: &str,
    body: JsonValue,
) -> Result<Response, GatewayError> {
    log_body(&state.config, "native.batch_embed_contents.request", &body);
    let raw = state.public_gemini.embed(model, "batchEmbedContents", &body).await?;
    Ok(Json(raw).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_embedding_values_are_extracted() {
        let raw = json!({"embedding": {"values": [0.1, 0.2]}});
        assert_eq!(extract_single_values(&raw).unwrap(), vec![0.1, 0.2]);
    }

    #[test]
    fn batch_embedding_values_preserve_request_order() {
        let raw = json!({"embeddings": [{"values": [0.1]}, {"values": [0.2, 0.3]}]});
        let values = extract_batch_values(&raw).unwrap();
        assert_eq!(values, vec![vec![0.1], vec![0.2, 0.3]]);
    }

    #[test]
    fn missing_embedding_key_is_malformed_content() {
        let raw = json!({"unexpected": true});
        assert!(extract_single_values(&raw).is_err());
    }
}
