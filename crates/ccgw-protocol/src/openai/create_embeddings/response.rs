use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingUsage {
    pub prompt_tokens: i64,
    pub total_tokens: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingObject {
    pub object: String,
    pub index: i64,
    pub embedding: Vec<f64>,
}

impl EmbeddingObject {
    pub fn new(index: i64, embedding: Vec<f64>) -> Self {
        Self { object: "embedding".to_string(), index, embedding }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEmbeddingResponse {
    pub object: String,
    pub data: Vec<EmbeddingObject>,
    pub model: String,
    pub usage: EmbeddingUsage,
}

impl CreateEmbeddingResponse {
    pub fn object_name() -> &'static str {
        "list"
    }
}
