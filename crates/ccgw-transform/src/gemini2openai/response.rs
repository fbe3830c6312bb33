use ccgw_protocol::gemini::{Candidate, FinishReason, GenerateContentResponse};
use ccgw_protocol::openai::{
    ChatCompletionChoice, ChatCompletionFinishReason, ChatCompletionMessageToolCall,
    ChatCompletionMessageToolCallFunction, ChatCompletionResponseMessage, CompletionUsage,
    CreateChatCompletionResponse,
};

use crate::context::FormatterContext;
use crate::time_util::parse_create_time_or_now;

/// Converts a canonical Gemini response into a non-streaming OpenAI
/// `chat.completion` object (spec §4.6 "OpenAI" non-streaming).
pub fn transform_response(
    response: &GenerateContentResponse,
    context: &FormatterContext,
) -> CreateChatCompletionResponse {
    let mut choices = Vec::new();
    for candidate in &response.candidates {
        choices.extend(expand_candidate(candidate));
    }

    let usage = Some(CompletionUsage {
        prompt_tokens: response
            .usage_metadata
            .as_ref()
            .and_then(|usage| usage.prompt_token_count)
            .unwrap_or(0),
        completion_tokens: response
            .usage_metadata
            .as_ref()
            .and_then(|usage| usage.candidates_token_count)
            .unwrap_or(0),
        total_tokens: response
            .usage_metadata
            .as_ref()
            .and_then(|usage| usage.total_token_count)
            .unwrap_or(0),
    });

    CreateChatCompletionResponse {
        id: format!(
            "chatcmpl-{}",
            context.resolve_response_id(response.response_id.as_deref())
        ),
        object: CreateChatCompletionResponse::object_name().to_string(),
        created: parse_create_time_or_now(response.create_time.as_deref()),
        model: context.resolve_model(response.model_version.as_deref()),
        choices,
        usage,
    }
}

fn expand_candidate(candidate: &Candidate) -> Vec<ChatCompletionChoice> {
    let index = candidate.index.unwrap_or(0);
    let mut choices = Vec::new();

    for part in &candidate.content.parts {
        if let Some(text) = part.as_text() {
            choices.push(ChatCompletionChoice {
                index,
                message: ChatCompletionResponseMessage {
                    role: "assistant".to_string(),
                    content: Some(text.to_string()),
                    tool_calls: None,
                },
                finish_reason: None,
            });
        } else if let Some(call) = part.as_function_call() {
            choices.push(ChatCompletionChoice {
                index,
                message: ChatCompletionResponseMessage {
                    role: "assistant".to_string(),
                    content: None,
                    tool_calls: Some(vec![ChatCompletionMessageToolCall {
                        id: call.name.clone(),
                        r#type: Some("function".to_string()),
                        function: ChatCompletionMessageToolCallFunction {
                            name: call.name.clone(),
                            arguments: call
                                .args
                                .as_ref()
                                .map(|value| value.to_string())
                                .unwrap_or_else(|| "{}".to_string()),
                        },
                    }]),
                },
                finish_reason: None,
            });
        }
    }

    if choices.is_empty() {
        choices.push(ChatCompletionChoice {
            index,
            message: ChatCompletionResponseMessage {
                role: "assistant".to_string(),
                content: Some(String::new()),
                tool_calls: None,
            },
            finish_reason: None,
        });
    }

    let finish_reason = map_finish_reason(candidate.finish_reason);
    if let Some(last) = choices.last_mut() {
        last.finish_reason = Some(finish_reason);
    }

    choices
}

fn map_finish_reason(reason: Option<FinishReason>) -> ChatCompletionFinishReason {
    match reason {
        Some(FinishReason::Stop) => ChatCompletionFinishReason::Stop,
        Some(FinishReason::MaxTokens) => ChatCompletionFinishReason::Length,
        Some(FinishReason::Safety) | Some(FinishReason::Recitation) => {
            ChatCompletionFinishReason::ContentFilter
        }
        Some(FinishReason::ToolUse) => ChatCompletionFinishReason::ToolCalls,
        Some(FinishReason::Unspecified) | None => {
            tracing::warn!("candidate finished without a recognised finish reason, mapping to stop");
            ChatCompletionFinishReason::Stop
        }
        Some(FinishReason::Other) => {
            tracing::warn!("candidate finished with an unmapped finish reason, mapping to stop");
            ChatCompletionFinishReason::Stop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccgw_protocol::gemini::{Content, ContentRole, FunctionCall, Part};

    #[test]
    fn text_and_tool_call_parts_each_yield_a_choice() {
        let response = GenerateContentResponse {
            candidates: vec![Candidate {
                content: Content {
                    parts: vec![
                        Part::text("Let me check. "),
                        Part::function_call(FunctionCall {
                            id: None,
                            name: "lookup".to_string(),
                            args: Some(serde_json::json!({"q": "x"})),
                        }),
                    ],
                    role: Some(ContentRole::Model),
                },
                finish_reason: Some(FinishReason::ToolUse),
                index: Some(0),
            }],
            usage_metadata: None,
            model_version: None,
            response_id: None,
            create_time: None,
        };
        let context = FormatterContext::new_openai("gemini-2.5-pro");
        let formatted = transform_response(&response, &context);
        assert_eq!(formatted.choices.len(), 2);
        assert!(formatted.choices[0].finish_reason.is_none());
        assert_eq!(
            formatted.choices[1].finish_reason,
            Some(ChatCompletionFinishReason::ToolCalls)
        );
        assert_eq!(
            formatted.choices[1].message.tool_calls.as_ref().unwrap()[0].id,
            "lookup"
        );
    }
}
