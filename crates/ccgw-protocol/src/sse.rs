use bytes::Bytes;
use serde_json::Value as JsonValue;

use crate::gemini::{GenerateContentResponse, UsageMetadata};

/// Accumulates raw bytes into complete `data: <line>` frames; used for the
/// upstream→canonical direction, where only `data:` lines carry payload.
#[derive(Debug, Default)]
pub struct DataLineReader {
    buffer: String,
}

impl DataLineReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of upstream bytes, returning every complete `data:` line
    /// body discovered so far (prefix stripped, trimmed). Non-`data:` lines
    /// and blank `data:` bodies are dropped silently.
    pub fn push(&mut self, chunk: &Bytes) -> Vec<String> {
        let Ok(text) = std::str::from_utf8(chunk) else {
            return Vec::new();
        };
        self.buffer.push_str(text);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let mut line = self.buffer[..pos].to_string();
            self.buffer.drain(..=pos);
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(body) = line.strip_prefix("data:") {
                let body = body.trim();
                if !body.is_empty() {
                    lines.push(body.to_string());
                }
            }
        }
        lines
    }
}

/// Applies the three-strategy extraction of §4.4 to a single parsed JSON
/// `data:` payload, producing a canonical response chunk.
pub fn extract_chunk(value: JsonValue) -> Option<GenerateContentResponse> {
    if value.get("candidates").is_some() {
        if let Ok(direct) = serde_json::from_value::<GenerateContentResponse>(value.clone()) {
            return Some(direct);
        }
    }

    if let Some(inner) = value.get("response") {
        if let Ok(mut chunk) = serde_json::from_value::<GenerateContentResponse>(inner.clone()) {
            if chunk.usage_metadata.is_none() {
                if let Some(outer_usage) = value.get("usageMetadata") {
                    if let Ok(usage) = serde_json::from_value::<UsageMetadata>(outer_usage.clone())
                    {
                        chunk.usage_metadata = Some(usage);
                    }
                }
            }
            return Some(chunk);
        }
    }

    if value.get("candidates").is_none() {
        if let Some(usage_value) = value.get("usageMetadata") {
            if let Ok(usage) = serde_json::from_value::<UsageMetadata>(usage_value.clone()) {
                return Some(GenerateContentResponse {
                    candidates: Vec::new(),
                    usage_metadata: Some(usage),
                    model_version: None,
                    response_id: None,
                    create_time: None,
                });
            }
        }
    }

    None
}

/// Unwraps a non-streaming upstream response envelope, accepting either
/// `response` or `result` as the wrapper key (spec §9 design notes: the
/// source's behavior for `result` is undefined; this implementation treats
/// it as an alias of `response`). Falls back to treating `value` itself as
/// the envelope when neither key is present, so a bare canonical response
/// also validates.
pub fn extract_full_response(value: &JsonValue) -> Option<GenerateContentResponse> {
    let inner = value.get("response").or_else(|| value.get("result"));
    let target = inner.unwrap_or(value);
    let mut response = serde_json::from_value::<GenerateContentResponse>(target.clone()).ok()?;
    if response.usage_metadata.is_none() {
        if let Some(usage_value) = value.get("usageMetadata") {
            if let Ok(usage) = serde_json::from_value::<UsageMetadata>(usage_value.clone()) {
                response.usage_metadata = Some(usage);
            }
        }
    }
    Some(response)
}

/// Parses one raw `data:` line body into a canonical chunk, logging and
/// skipping on any JSON or shape failure rather than aborting the stream.
pub fn parse_data_line(line: &str) -> Option<GenerateContentResponse> {
    match serde_json::from_str::<JsonValue>(line) {
        Ok(value) => {
            let chunk = extract_chunk(value);
            if chunk.is_none() {
                tracing::warn!(line, "dropping unrecognised SSE data line");
            }
            chunk
        }
        Err(error) => {
            tracing::warn!(%error, line, "failed to parse SSE data line as JSON");
            None
        }
    }
}

/// One generic SSE frame (`event:` / `data:` pair), used by the Claude
/// formatter to emit its named-event sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(event) = &self.event {
            out.push_str("event: ");
            out.push_str(event);
            out.push('\n');
        }
        for line in self.data.split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_response_validates_in_first_strategy() {
        let value = json!({"candidates": [], "modelVersion": "gemini-2.5-pro"});
        let chunk = extract_chunk(value).expect("chunk");
        assert_eq!(chunk.model_version.as_deref(), Some("gemini-2.5-pro"));
    }

    #[test]
    fn wrapped_response_copies_sibling_usage() {
        let value = json!({
            "response": {"candidates": []},
            "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 2, "totalTokenCount": 7},
        });
        let chunk = extract_chunk(value).expect("chunk");
        let usage = chunk.usage_metadata.expect("usage");
        assert_eq!(usage.prompt_token_count, Some(5));
    }

    #[test]
    fn usage_only_frame_yields_empty_candidates() {
        let value = json!({"usageMetadata": {"totalTokenCount": 3}});
        let chunk = extract_chunk(value).expect("chunk");
        assert_eq!(chunk.candidates, Vec::new());
    }

    #[test]
    fn garbage_line_is_skipped() {
        assert!(parse_data_line("not json").is_none());
    }

    #[test]
    fn full_response_accepts_response_wrapper() {
        let value = json!({"response": {"candidates": [], "modelVersion": "gemini-2.5-pro"}});
        let response = extract_full_response(&value).expect("response");
        assert_eq!(response.model_version.as_deref(), Some("gemini-2.5-pro"));
    }

    #[test]
    fn full_response_accepts_result_wrapper_as_alias() {
        let value = json!({"result": {"candidates": []}, "usageMetadata": {"totalTokenCount": 4}});
        let response = extract_full_response(&value).expect("response");
        assert_eq!(response.usage_metadata.unwrap().total_token_count, Some(4));
    }

    #[test]
    fn full_response_accepts_bare_canonical_body() {
        let value = json!({"candidates": []});
        assert!(extract_full_response(&value).is_some());
    }

    #[test]
    fn data_line_reader_splits_on_newlines_and_ignores_other_lines() {
        let mut reader = DataLineReader::new();
        let lines = reader.push(&Bytes::from_static(
            b"event: ping\ndata: {\"a\":1}\n\ndata: {\"a\":2}\n",
        ));
        assert_eq!(lines, vec!["{\"a\":1}".to_string(), "{\"a\":2}".to_string()]);
    }
}
