use ccgw_protocol::gemini::{Candidate, FinishReason, GenerateContentResponse};
use ccgw_protocol::openai::{
    ChatCompletionFinishReason, ChatCompletionStreamChoice, ChatCompletionStreamResponseDelta,
    ChatCompletionStreamToolCallChunk, CompletionUsage, CreateChatCompletionStreamResponse,
};

use crate::context::FormatterContext;
use crate::time_util::parse_create_time_or_now;

/// Stateful OpenAI `chat.completion.chunk` formatter. One instance per
/// request; `role: assistant` is only sent on the first delta produced for
/// a given choice index (spec §4.6 "OpenAI" streaming).
#[derive(Debug)]
pub struct GeminiToOpenAiStreamState {
    context: FormatterContext,
    response_id: Option<String>,
    model: Option<String>,
    created: Option<i64>,
    role_sent: std::collections::BTreeSet<i64>,
}

impl GeminiToOpenAiStreamState {
    pub fn new(context: FormatterContext) -> Self {
        Self {
            context,
            response_id: None,
            model: None,
            created: None,
            role_sent: std::collections::BTreeSet::new(),
        }
    }

    /// Feeds one upstream chunk, returning zero or more `chat.completion.chunk`
    /// frames. Call with `None` once to flush end-of-stream chunks if any
    /// finish reason arrived in the final `Some` chunk instead.
    pub fn on_chunk(
        &mut self,
        chunk: &GenerateContentResponse,
    ) -> Vec<CreateChatCompletionStreamResponse> {
        if self.response_id.is_none() {
            self.response_id = Some(self.context.resolve_response_id(chunk.response_id.as_deref()));
        }
        if self.model.is_none() {
            self.model = Some(self.context.resolve_model(chunk.model_version.as_deref()));
        }
        if self.created.is_none() {
            self.created = Some(parse_create_time_or_now(chunk.create_time.as_deref()));
        }

        let usage = chunk.usage_metadata.as_ref().map(|usage| CompletionUsage {
            prompt_tokens: usage.prompt_token_count.unwrap_or(0),
            completion_tokens: usage.candidates_token_count.unwrap_or(0),
            total_tokens: usage.total_token_count.unwrap_or(0),
        });

        let mut frames = Vec::new();
        for (position, candidate) in chunk.candidates.iter().enumerate() {
            let choice_index = candidate.index.unwrap_or(position as i64);
            frames.extend(self.handle_candidate(choice_index, candidate, usage.clone()));
        }
        frames
    }

    fn handle_candidate(
        &mut self,
        choice_index: i64,
        candidate: &Candidate,
        usage: Option<CompletionUsage>,
    ) -> Vec<CreateChatCompletionStreamResponse> {
        let mut frames = Vec::new();
        let first_role = self.role_sent.insert(choice_index);

        for (part_index, part) in candidate.content.parts.iter().enumerate() {
            let role = if first_role && part_index == 0 {
                Some("assistant".to_string())
            } else {
                None
            };

            if let Some(text) = part.as_text() {
                frames.push(self.frame(
                    choice_index,
                    ChatCompletionStreamResponseDelta {
                        role,
                        content: Some(text.to_string()),
                        tool_calls: None,
                    },
                    None,
                    None,
                ));
            } else if let Some(call) = part.as_function_call() {
                frames.push(self.frame(
                    choice_index,
                    ChatCompletionStreamResponseDelta {
                        role,
                        content: None,
                        tool_calls: Some(vec![ChatCompletionStreamToolCallChunk {
                            index: 0,
                            id: Some(call.name.clone()),
                            r#type: Some("function".to_string()),
                            function: Some(ccgw_protocol::openai::ChatCompletionMessageToolCallFunction {
                                name: call.name.clone(),
                                arguments: call
                                    .args
                                    .as_ref()
                                    .map(|value| value.to_string())
                                    .unwrap_or_else(|| "{}".to_string()),
                            }),
                        }]),
                    },
                    None,
                    None,
                ));
            }
        }

        if let Some(reason) = candidate.finish_reason {
            frames.push(self.frame(
                choice_index,
                ChatCompletionStreamResponseDelta::default(),
                Some(map_finish_reason(reason)),
                usage,
            ));
        }

        frames
    }

    fn frame(
        &self,
        choice_index: i64,
        delta: ChatCompletionStreamResponseDelta,
        finish_reason: Option<ChatCompletionFinishReason>,
        usage: Option<CompletionUsage>,
    ) -> CreateChatCompletionStreamResponse {
        CreateChatCompletionStreamResponse {
            id: format!("chatcmpl-{}", self.response_id.as_deref().unwrap_or_default()),
            object: CreateChatCompletionStreamResponse::object_name().to_string(),
            created: self.created.unwrap_or(0),
            model: self.model.clone().unwrap_or_default(),
            choices: vec![ChatCompletionStreamChoice {
                index: choice_index,
                delta,
                finish_reason,
            }],
            usage,
        }
    }
}

fn map_finish_reason(reason: FinishReason) -> ChatCompletionFinishReason {
    match reason {
        FinishReason::Stop => ChatCompletionFinishReason::Stop,
        FinishReason::MaxTokens => ChatCompletionFinishReason::Length,
        FinishReason::Safety | FinishReason::Recitation => ChatCompletionFinishReason::ContentFilter,
        FinishReason::ToolUse => ChatCompletionFinishReason::ToolCalls,
        FinishReason::Unspecified | FinishReason::Other => ChatCompletionFinishReason::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccgw_protocol::gemini::{Content, ContentRole, FunctionCall, Part};

    fn chunk_with_text(text: &str) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Content {
                    parts: vec![Part::text(text)],
                    role: Some(ContentRole::Model),
                },
                finish_reason: None,
                index: Some(0),
            }],
            usage_metadata: None,
            model_version: Some("gemini-2.5-pro".to_string()),
            response_id: Some("resp-1".to_string()),
            create_time: None,
        }
    }

    #[test]
    fn first_delta_for_a_choice_carries_the_role() {
        let mut state = GeminiToOpenAiStreamState::new(FormatterContext::new_openai("gemini-2.5-pro"));
        let frames = state.on_chunk(&chunk_with_text("hi"));
        assert_eq!(frames[0].choices[0].delta.role.as_deref(), Some("assistant"));

        let frames = state.on_chunk(&chunk_with_text(" there"));
        assert!(frames[0].choices[0].delta.role.is_none());
    }

    #[test]
    fn finish_reason_emitted_as_its_own_trailing_frame() {
        let mut state = GeminiToOpenAiStreamState::new(FormatterContext::new_openai("gemini-2.5-pro"));
        let mut chunk = chunk_with_text("done");
        chunk.candidates[0].finish_reason = Some(FinishReason::Stop);
        let frames = state.on_chunk(&chunk);
        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[1].choices[0].finish_reason,
            Some(ChatCompletionFinishReason::Stop)
        );
    }

    #[test]
    fn tool_call_part_yields_a_tool_call_delta() {
        let mut state = GeminiToOpenAiStreamState::new(FormatterContext::new_openai("gemini-2.5-pro"));
        let chunk = GenerateContentResponse {
            candidates: vec![Candidate {
                content: Content {
                    parts: vec![Part::function_call(FunctionCall {
                        id: None,
                        name: "lookup".to_string(),
                        args: Some(serde_json::json!({"q": "x"})),
                    })],
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
        let frames = state.on_chunk(&chunk);
        let tool_calls = frames[0].choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(tool_calls[0].id.as_deref(), Some("lookup"));
        assert_eq!(
            frames[1].choices[0].finish_reason,
            Some(ChatCompletionFinishReason::ToolCalls)
        );
    }
}
