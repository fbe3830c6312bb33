use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::Method;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use ccgw_protocol::claude::CreateMessageRequest;
use ccgw_protocol::gemini::GenerateContentRequestBody;
use ccgw_protocol::openai::{CreateChatCompletionRequest, CreateEmbeddingRequest};
use serde_json::Value as JsonValue;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::auth_gate;
use crate::error::GatewayError;
use crate::logging::request_logging;
use crate::services::{chat, embeddings, models};
use crate::state::AppState;

/// Builds the full router (spec §6 "External interfaces"): the OpenAI and
/// Claude surfaces first, then the native `/v1beta/models/{model}:action`
/// family, all behind the auth gate, plus unauthenticated health routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.config.cors_allowed_origins);

    let guarded = Router::new()
        .route("/v1/chat/completions", post(openai_chat_completions))
        .route("/v1/embeddings", post(openai_embeddings))
        .route("/v1/models", get(openai_model_list))
        .route("/v1/messages", post(claude_messages))
        .route("/v1beta/models", get(gemini_model_list))
        .route("/v1beta/models/{*rest}", post(native_dispatch))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), auth_gate));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(guarded)
        .layer(cors)
        .layer(axum::middleware::from_fn(request_logging))
        .with_state(state)
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST]).allow_headers(Any);
    if allowed_origins.iter().any(|origin| origin == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse::<axum::http::HeaderValue>().ok())
            .collect();
        layer.allow_origin(origins)
    }
}

async fn root() -> &'static str {
    "ccgw"
}

async fn health() -> &'static str {
    "ok"
}

async fn openai_chat_completions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateChatCompletionRequest>,
) -> Result<Response, GatewayError> {
    chat::openai_chat_completions(&state, request).await
}

async fn openai_embeddings(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateEmbeddingRequest>,
) -> Result<Response, GatewayError> {
    embeddings::openai_embeddings(&state, request).await
}

async fn openai_model_list() -> Response {
    models::openai_model_list()
}

async fn claude_messages(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateMessageRequest>,
) -> Result<Response, GatewayError> {
    chat::claude_messages(&state, request).await
}

async fn gemini_model_list() -> Response {
    models::gemini_model_list()
}

/// Every native Gemini action shares one path shape,
/// `models/{model}:{action}` — the colon is part of the path segment, not a
/// separate route parameter, so it's split out here rather than in the
/// router (spec §6, mirroring the upstream Cloud Code Assist API).
async fn native_dispatch(
    State(state): State<Arc<AppState>>,
    Path(rest): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Response, GatewayError> {
    let (model, action) = rest
        .split_once(':')
        .ok_or_else(|| GatewayError::AdapterValidation(format!("malformed model path: {rest}")))?;

    match action {
        "generateContent" => {
            let parsed = parse_generate_content_body(body)?;
            chat::native_generate_content(&state, model, parsed, false).await
        }
        "streamGenerateContent" => {
            let parsed = parse_generate_content_body(body)?;
            chat::native_generate_content(&state, model, parsed, true).await
        }
        "countTokens" => models::count_tokens(&state, model, body).await,
        "embedContent" => embeddings::native_embed_content(&state, model, body).await,
        "batchEmbedContents" => embeddings::native_batch_embed_contents(&state, model, body).await,
        other => Err(GatewayError::AdapterValidation(format!("unsupported action: {other}"))),
    }
}

fn parse_generate_content_body(body: JsonValue) -> Result<GenerateContentRequestBody, GatewayError> {
    serde_json::from_value(body)
        .map_err(|err| GatewayError::AdapterValidation(format!("invalid generateContent body: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_model_path_splits_on_last_colon() {
        let rest = "publishers/google/models/gemini-2.5-pro:streamGenerateContent";
        let (model, action) = rest.split_once(':').unwrap();
        assert_eq!(model, "publishers/google/models/gemini-2.5-pro");
        assert_eq!(action, "streamGenerateContent");
    }

    #[test]
    fn wildcard_model_path_without_colon_is_rejected() {
        assert!("gemini-2.5-pro".split_once(':').is_none());
    }
}
