use serde::{Deserialize, Serialize};

use super::types::{GenerateContentRequestBody, GenerateContentResponse};

/// `{model}` path component shared by `generateContent`, `streamGenerateContent`
/// and `countTokens`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPath {
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub path: ModelPath,
    pub body: GenerateContentRequestBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamGenerateContentRequest {
    pub path: ModelPath,
    pub body: GenerateContentRequestBody,
}

pub type GenerateContentResponseBody = GenerateContentResponse;
