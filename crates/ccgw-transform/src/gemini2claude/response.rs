use ccgw_protocol::claude::{CreateMessageResponse, MessageContentBlock, MessageUsage, StopReason};
use ccgw_protocol::gemini::{FinishReason, GenerateContentResponse};

use crate::context::FormatterContext;

/// Converts a canonical Gemini response into a non-streaming Claude
/// `message` object, using the same Part→block and finish-reason mappings
/// as the streaming formatter (spec §4.6).
pub fn transform_response(
    response: &GenerateContentResponse,
    context: &FormatterContext,
) -> CreateMessageResponse {
    let candidate = response.candidates.first();

    let content = candidate
        .map(|candidate| {
            candidate
                .content
                .parts
                .iter()
                .filter_map(map_part)
                .collect()
        })
        .unwrap_or_default();

    let tool_use_open = content
        .last()
        .is_some_and(|block| matches!(block, MessageContentBlock::ToolUse { .. }));

    let stop_reason = if tool_use_open {
        Some(StopReason::ToolUse)
    } else {
        Some(map_finish_reason(candidate.and_then(|c| c.finish_reason)))
    };

    CreateMessageResponse {
        id: format!(
            "msg_{}",
            context.resolve_response_id(response.response_id.as_deref())
        ),
        r#type: CreateMessageResponse::type_name().to_string(),
        role: "assistant".to_string(),
        content,
        model: context.resolve_model(response.model_version.as_deref()),
        stop_reason,
        stop_sequence: None,
        usage: MessageUsage {
            input_tokens: response
                .usage_metadata
                .as_ref()
                .and_then(|usage| usage.prompt_token_count)
                .unwrap_or(0),
            output_tokens: response
                .usage_metadata
                .as_ref()
                .and_then(|usage| usage.candidates_token_count)
                .unwrap_or(0),
        },
    }
}

fn map_part(part: &ccgw_protocol::gemini::Part) -> Option<MessageContentBlock> {
    if let Some(text) = part.as_text() {
        Some(MessageContentBlock::Text { text: text.to_string() })
    } else if let Some(call) = part.as_function_call() {
        Some(MessageContentBlock::ToolUse {
            id: call.name.clone(),
            name: call.name.clone(),
            input: call.args.clone().unwrap_or_else(|| serde_json::json!({})),
        })
    } else {
        None
    }
}

pub(crate) fn map_finish_reason(reason: Option<FinishReason>) -> StopReason {
    match reason {
        Some(FinishReason::Stop) => StopReason::EndTurn,
        Some(FinishReason::MaxTokens) => StopReason::MaxTokens,
        Some(FinishReason::ToolUse) => StopReason::ToolUse,
        None => {
            tracing::warn!("candidate finished without a recognised finish reason, mapping to end_turn");
            StopReason::EndTurn
        }
        Some(_) => {
            tracing::warn!("candidate finished with an unmapped finish reason, mapping to stop");
            StopReason::Stop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccgw_protocol::gemini::{Candidate, Content, ContentRole, Part};

    #[test]
    fn tool_use_as_last_block_forces_stop_reason_tool_use() {
        let response = GenerateContentResponse {
            candidates: vec![Candidate {
                content: Content {
                    parts: vec![Part::function_call(ccgw_protocol::gemini::FunctionCall {
                        id: None,
                        name: "lookup".to_string(),
                        args: Some(serde_json::json!({"q": "x"})),
                    })],
                    role: Some(ContentRole::Model),
                },
                finish_reason: Some(FinishReason::Stop),
                index: Some(0),
            }],
            usage_metadata: None,
            model_version: None,
            response_id: None,
            create_time: None,
        };
        let context = FormatterContext::new_claude("gemini-2.5-pro");
        let formatted = transform_response(&response, &context);
        assert_eq!(formatted.stop_reason, Some(StopReason::ToolUse));
    }
}
