use axum::Json;
use axum::response::{IntoResponse, Response};
use ccgw_protocol::claude::CreateMessageRequest;
use ccgw_protocol::gemini::{GenerateContentRequestBody, default_safety_settings};
use ccgw_protocol::openai::CreateChatCompletionRequest;
use ccgw_protocol::sse::extract_full_response;
use ccgw_transform::FormatterContext;
use ccgw_transform::{claude2gemini, gemini2claude, gemini2openai, native, openai2gemini};

use crate::error::GatewayError;
use crate::redact::log_body;
use crate::state::AppState;
use crate::stream_processor;

fn wrap_body(model: &str, project: &str, body: &GenerateContentRequestBody) -> serde_json::Value {
    serde_json::json!({ "model": model, "project": project, "request": body })
}

/// Every adapter installs the "allow everything" safety settings unless the
/// inbound request already specified its own (spec §4.5).
fn with_default_safety(mut body: GenerateContentRequestBody) -> GenerateContentRequestBody {
    if body.safety_settings.is_none() {
        body.safety_settings = Some(default_safety_settings());
    }
    body
}

pub async fn openai_chat_completions(
    state: &AppState,
    request: CreateChatCompletionRequest,
) -> Result<Response, GatewayError> {
    log_body(&state.config, "openai.chat_completions.request", &request);
    let model = request.model.clone();
    let stream = request.stream;
    let body = with_default_safety(openai2gemini::transform_request(
        &request,
        &state.config.unsupported_tool_schema_keys,
    ));

    let (access_token, project_id) = state.acquire_credential().await?;
    let wrapped = wrap_body(&model, &project_id, &body);
    let context = FormatterContext::new_openai(model);

    if stream {
        let upstream = state
            .code_assist
            .stream_json(&access_token, "streamGenerateContent", &wrapped)
            .await?;
        Ok(stream_processor::openai_stream(upstream, context))
    } else {
        let raw = state.code_assist.post_json(&access_token, "generateContent", &wrapped).await?;
        let response =
            extract_full_response(&raw).ok_or(GatewayError::MalformedUpstreamContent("candidates"))?;
        Ok(Json(gemini2openai::transform_response(&response, &context)).into_response())
    }
}

pub async fn claude_messages(
    state: &AppState,
    request: CreateMessageRequest,
) -> Result<Response, GatewayError> {
    log_body(&state.config, "claude.messages.request", &request);
    let model = request.model.clone();
    let stream = request.stream;
    let body = with_default_safety(claude2gemini::transform_request(
        &request,
        &state.config.unsupported_tool_schema_keys,
    ));

    let (access_token, project_id) = state.acquire_credential().await?;
    let wrapped = wrap_body(&model, &project_id, &body);
    let context = FormatterContext::new_claude(model);

    if stream {
        let upstream = state
            .code_assist
            .stream_json(&access_token, "streamGenerateContent", &wrapped)
            .await?;
        Ok(stream_processor::claude_stream(upstream, context))
    } else {
        let raw = state.code_assist.post_json(&access_token, "generateContent", &wrapped).await?;
        let response =
            extract_full_response(&raw).ok_or(GatewayError::MalformedUpstreamContent("candidates"))?;
        Ok(Json(gemini2claude::transform_response(&response, &context)).into_response())
    }
}

/// Native Gemini `generateContent` / `streamGenerateContent`: the inbound
/// body is already the canonical shape, so only the safety-settings default
/// and the upstream envelope are applied (spec §4.5 "native Gemini").
pub async fn native_generate_content(
    state: &AppState,
    model: &str,
    body: GenerateContentRequestBody,
    streaming: bool,
) -> Result<Response, GatewayError> {
    log_body(&state.config, "native.generate_content.request", &body);
    let body = with_default_safety(native::transform_request(body));
    let (access_token, project_id) = state.acquire_credential().await?;
    let wrapped = wrap_body(model, &project_id, &body);

    if streaming {
        let upstream = state
            .code_assist
            .stream_json(&access_token, "streamGenerateContent", &wrapped)
            .await?;
        Ok(stream_processor::native_stream(upstream))
    } else {
        let raw = state.code_assist.post_json(&access_token, "generateContent", &wrapped).await?;
        let response =
            extract_full_response(&raw).ok_or(GatewayError::MalformedUpstreamContent("candidates"))?;
        Ok(Json(response).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_body_carries_model_project_and_request() {
        let body = GenerateContentRequestBody::default();
        let wrapped = wrap_body("gemini-2.5-pro", "proj-1", &body);
        assert_eq!(wrapped["model"], "gemini-2.5-pro");
        assert_eq!(wrapped["project"], "proj-1");
        assert!(wrapped["request"].is_object());
    }

    #[test]
    fn default_safety_settings_filled_in_when_absent() {
        let body = with_default_safety(GenerateContentRequestBody::default());
        assert_eq!(body.safety_settings.unwrap().len(), default_safety_settings().len());
    }

    #[test]
    fn existing_safety_settings_are_left_untouched() {
        let mut body = GenerateContentRequestBody::default();
        body.safety_settings = Some(Vec::new());
        let body = with_default_safety(body);
        assert!(body.safety_settings.unwrap().is_empty());
    }
}
