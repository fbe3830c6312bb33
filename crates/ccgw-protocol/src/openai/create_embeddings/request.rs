use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// `input` may be a single string or a batch list (spec §4.5 embeddings
/// adapter). Batch items are kept as raw JSON rather than `Vec<String>` so a
/// non-string entry doesn't fail deserialization of the whole request — the
/// spec calls for dropping it with a warning at transform time instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<JsonValue>),
}

impl EmbeddingInput {
    /// Resolves to a list of strings, dropping non-string batch items with a
    /// warning (spec §4.5 "OpenAI embedding").
    pub fn into_vec(self) -> Vec<String> {
        match self {
            EmbeddingInput::Single(value) => vec![value],
            EmbeddingInput::Batch(values) => values
                .into_iter()
                .filter_map(|value| match value {
                    JsonValue::String(text) => Some(text),
                    other => {
                        tracing::warn!(item = %other, "dropping non-string embedding batch item");
                        None
                    }
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEmbeddingRequest {
    pub model: String,
    pub input: EmbeddingInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<i64>,
}
