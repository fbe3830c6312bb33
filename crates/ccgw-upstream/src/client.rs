use bytes::Bytes;
use ccgw_common::user_agent;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde_json::Value as JsonValue;

use crate::error::UpstreamError;

fn code_assist_action_url(base_url: &str, action: &str, stream: bool) -> String {
    let mut url = format!("{base_url}/v1internal:{action}");
    if stream {
        url.push_str("?alt=sse");
    }
    url
}

fn public_embed_url(base_url: &str, model: &str, action: &str, api_key: &str) -> String {
    format!("{base_url}/v1beta/models/{model}:{action}?key={api_key}")
}

/// Issues signed calls against the Cloud Code Assist endpoint (spec §4.3).
/// Auth is a bearer access token supplied per call — the client itself is
/// stateless with respect to credentials, since the pool owns rotation.
#[derive(Debug, Clone)]
pub struct CodeAssistClient {
    client: wreq::Client,
    base_url: String,
}

impl CodeAssistClient {
    pub fn new(client: wreq::Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }

    /// Non-streaming call to `generateContent` or `countTokens` (or, from
    /// the onboarding coordinator's perspective, `loadCodeAssist` /
    /// `onboardUser` — those two go through `OnboardingCoordinator`
    /// instead, since they're memoised per credential rather than issued
    /// per request).
    pub async fn post_json(
        &self,
        access_token: &str,
        action: &str,
        body: &JsonValue,
    ) -> Result<JsonValue, UpstreamError> {
        let url = code_assist_action_url(&self.base_url, action, false);
        let response = self
            .client
            .post(&url)
            .header("authorization", format!("Bearer {access_token}"))
            .header("user-agent", user_agent())
            .json(body)
            .send()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.bytes().await.unwrap_or_default();
            return Err(UpstreamError::from_response_body(status.as_u16(), raw));
        }
        response
            .json()
            .await
            .map_err(|err| UpstreamError::InvalidJson(err.to_string()))
    }

    /// Streaming call to `streamGenerateContent`. Returns the raw byte
    /// stream for the SSE parser (§4.4) to consume line by line; a non-2xx
    /// response is still fully drained and converted to `UpstreamError`
    /// before any bytes reach the caller, matching the non-streaming path.
    pub async fn stream_json(
        &self,
        access_token: &str,
        action: &str,
        body: &JsonValue,
    ) -> Result<BoxStream<'static, Result<Bytes, UpstreamError>>, UpstreamError> {
        let url = code_assist_action_url(&self.base_url, action, true);
        let response = self
            .client
            .post(&url)
            .header("authorization", format!("Bearer {access_token}"))
            .header("user-agent", user_agent())
            .header("accept", "text/event-stream")
            .json(body)
            .send()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.bytes().await.unwrap_or_default();
            return Err(UpstreamError::from_response_body(status.as_u16(), raw));
        }

        Ok(response
            .bytes_stream()
            .map(|item| item.map_err(|err| UpstreamError::Transport(err.to_string())))
            .boxed())
    }
}

/// Issues calls against the public Gemini endpoint for embeddings (spec
/// §4.3). Auth is a configured API key sent as the `key` query parameter —
/// no credential rotation is involved (spec §4.7 "Embedding service").
#[derive(Debug, Clone)]
pub struct PublicGeminiClient {
    client: wreq::Client,
    base_url: String,
    api_key: String,
}

impl PublicGeminiClient {
    pub fn new(client: wreq::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into(), api_key: api_key.into() }
    }

    pub async fn embed(
        &self,
        model: &str,
        action: &str,
        body: &JsonValue,
    ) -> Result<JsonValue, UpstreamError> {
        let url = public_embed_url(&self.base_url, model, action, &self.api_key);
        let response = self
            .client
            .post(&url)
            .header("user-agent", user_agent())
            .json(body)
            .send()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.bytes().await.unwrap_or_default();
            return Err(UpstreamError::from_response_body(status.as_u16(), raw));
        }
        response
            .json()
            .await
            .map_err(|err| UpstreamError::InvalidJson(err.to_string()))
    }
}
