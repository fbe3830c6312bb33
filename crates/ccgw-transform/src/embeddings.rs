use ccgw_protocol::openai::{CreateEmbeddingRequest, EmbeddingInput, EmbeddingObject, EmbeddingUsage};
use serde_json::Value as JsonValue;

/// The upstream call an embedding request resolves to (spec §4.5 "OpenAI
/// embedding"): either a single `embedContent` call or a batch
/// `batchEmbedContents` call, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingUpstreamCall {
    EmbedContent { model: String, body: JsonValue },
    BatchEmbedContents { model: String, body: JsonValue },
}

/// Builds the upstream embedding call body. Non-string batch items are
/// dropped with a warning rather than rejecting the whole request.
pub fn transform_request(request: &CreateEmbeddingRequest) -> EmbeddingUpstreamCall {
    match &request.input {
        EmbeddingInput::Single(text) => EmbeddingUpstreamCall::EmbedContent {
            model: request.model.clone(),
            body: serde_json::json!({"content": {"parts": [{"text": text}]}}),
        },
        batch @ EmbeddingInput::Batch(_) => {
            let items = batch.clone().into_vec();
            let requests: Vec<JsonValue> = items
                .iter()
                .map(|text| {
                    serde_json::json!({
                        "model": request.model,
                        "content": {"parts": [{"text": text}]},
                    })
                })
                .collect();
            EmbeddingUpstreamCall::BatchEmbedContents {
                model: request.model.clone(),
                body: serde_json::json!({"requests": requests}),
            }
        }
    }
}

/// Assembles the OpenAI-shaped embedding list response from the raw
/// embedding vectors returned by the upstream call, in request order.
pub fn build_response(
    model: &str,
    embeddings: Vec<Vec<f64>>,
) -> ccgw_protocol::openai::CreateEmbeddingResponse {
    let data = embeddings
        .into_iter()
        .enumerate()
        .map(|(index, embedding)| EmbeddingObject::new(index as i64, embedding))
        .collect();

    ccgw_protocol::openai::CreateEmbeddingResponse {
        object: ccgw_protocol::openai::CreateEmbeddingResponse::object_name().to_string(),
        data,
        model: model.to_string(),
        usage: EmbeddingUsage {
            prompt_tokens: 0,
            total_tokens: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_input_produces_batch_embed_contents_request() {
        let request = CreateEmbeddingRequest {
            model: "text-embedding-004".to_string(),
            input: EmbeddingInput::Batch(vec![
                JsonValue::String("a".to_string()),
                JsonValue::String("b".to_string()),
            ]),
            encoding_format: None,
            dimensions: None,
        };
        let call = transform_request(&request);
        match call {
            EmbeddingUpstreamCall::BatchEmbedContents { body, .. } => {
                assert_eq!(body["requests"].as_array().unwrap().len(), 2);
                assert_eq!(body["requests"][0]["content"]["parts"][0]["text"], "a");
            }
            _ => panic!("expected batch call"),
        }
    }

    #[test]
    fn batch_input_drops_non_string_items() {
        let request = CreateEmbeddingRequest {
            model: "text-embedding-004".to_string(),
            input: EmbeddingInput::Batch(vec![
                JsonValue::String("a".to_string()),
                serde_json::json!(42),
            ]),
            encoding_format: None,
            dimensions: None,
        };
        let call = transform_request(&request);
        match call {
            EmbeddingUpstreamCall::BatchEmbedContents { body, .. } => {
                assert_eq!(body["requests"].as_array().unwrap().len(), 1);
                assert_eq!(body["requests"][0]["content"]["parts"][0]["text"], "a");
            }
            _ => panic!("expected batch call"),
        }
    }

    #[test]
    fn single_input_produces_embed_content_request() {
        let request = CreateEmbeddingRequest {
            model: "text-embedding-004".to_string(),
            input: EmbeddingInput::Single("hello".to_string()),
            encoding_format: None,
            dimensions: None,
        };
        let call = transform_request(&request);
        match call {
            EmbeddingUpstreamCall::EmbedContent { body, .. } => {
                assert_eq!(body["content"]["parts"][0]["text"], "hello");
            }
            _ => panic!("expected embedContent call"),
        }
    }
}
