use ccgw_protocol::claude::{
    ContentBlockDelta, ContentBlockStub, MessageDeltaPayload, MessageStreamEvent, MessageUsage,
    StreamMessageStub,
};
use ccgw_protocol::gemini::{FinishReason, GenerateContentResponse, Part, UsageMetadata};

use crate::context::FormatterContext;
use crate::gemini2claude::response::map_finish_reason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Text,
    ToolUse,
}

/// Stateful Claude SSE formatter, one instance per request (spec §4.6
/// "Claude streaming — stateful state machine"). Avoid sharing across
/// requests: all state (open block, index, captured id/model) is per-call.
#[derive(Debug)]
pub struct GeminiToClaudeStreamState {
    context: FormatterContext,
    response_id: Option<String>,
    model: Option<String>,
    input_tokens: i64,
    started: bool,
    finished: bool,
    index: usize,
    open_block: Option<BlockKind>,
}

impl GeminiToClaudeStreamState {
    pub fn new(context: FormatterContext) -> Self {
        Self {
            context,
            response_id: None,
            model: None,
            input_tokens: 0,
            started: false,
            finished: false,
            index: 0,
            open_block: None,
        }
    }

    /// Feeds one upstream chunk. If the chunk carries a candidate with a
    /// `finishReason`, the end-of-stream events are appended automatically.
    pub fn on_chunk(&mut self, chunk: &GenerateContentResponse) -> Vec<MessageStreamEvent> {
        let mut events = Vec::new();

        if self.response_id.is_none() {
            self.response_id = Some(self.context.resolve_response_id(chunk.response_id.as_deref()));
        }
        if self.model.is_none() {
            self.model = Some(self.context.resolve_model(chunk.model_version.as_deref()));
        }
        if let Some(usage) = &chunk.usage_metadata
            && let Some(prompt_tokens) = usage.prompt_token_count
        {
            self.input_tokens = prompt_tokens;
        }

        self.ensure_started(&mut events);

        let mut finish_reason = None;
        for candidate in &chunk.candidates {
            for part in &candidate.content.parts {
                self.handle_part(part, &mut events);
            }
            if let Some(reason) = candidate.finish_reason {
                finish_reason = Some(reason);
            }
        }

        if finish_reason.is_some() {
            self.finish(finish_reason, chunk.usage_metadata.as_ref(), &mut events);
        }

        events
    }

    /// Called once the upstream body ends without any chunk ever carrying a
    /// `finishReason`.
    pub fn finish_without_reason(&mut self) -> Vec<MessageStreamEvent> {
        let mut events = Vec::new();
        self.ensure_started(&mut events);
        self.finish(None, None, &mut events);
        events
    }

    fn ensure_started(&mut self, events: &mut Vec<MessageStreamEvent>) {
        if self.started {
            return;
        }
        self.started = true;
        events.push(MessageStreamEvent::MessageStart {
            message: StreamMessageStub {
                id: format!("msg_{}", self.response_id.clone().unwrap_or_default()),
                r#type: "message".to_string(),
                role: "assistant".to_string(),
                content: Vec::new(),
                model: self.model.clone().unwrap_or_default(),
                usage: MessageUsage {
                    input_tokens: self.input_tokens,
                    output_tokens: 0,
                },
            },
        });
    }

    fn handle_part(&mut self, part: &Part, events: &mut Vec<MessageStreamEvent>) {
        let kind = if part.as_text().is_some() {
            BlockKind::Text
        } else if part.as_function_call().is_some() {
            BlockKind::ToolUse
        } else {
            return;
        };

        if let Some(open) = self.open_block
            && open != kind
        {
            events.push(MessageStreamEvent::ContentBlockStop { index: self.index });
            self.index += 1;
            self.open_block = None;
        }

        if self.open_block.is_none() {
            let content_block = match kind {
                BlockKind::Text => ContentBlockStub::Text { text: String::new() },
                BlockKind::ToolUse => {
                    let call = part.as_function_call().expect("checked above");
                    ContentBlockStub::ToolUse {
                        id: call.name.clone(),
                        name: call.name.clone(),
                        input: serde_json::json!({}),
                    }
                }
            };
            events.push(MessageStreamEvent::ContentBlockStart {
                index: self.index,
                content_block,
            });
            self.open_block = Some(kind);
        }

        let delta = match kind {
            BlockKind::Text => ContentBlockDelta::TextDelta {
                text: part.as_text().expect("checked above").to_string(),
            },
            BlockKind::ToolUse => {
                let call = part.as_function_call().expect("checked above");
                ContentBlockDelta::InputJsonDelta {
                    partial_json: call
                        .args
                        .as_ref()
                        .map(|value| value.to_string())
                        .unwrap_or_else(|| "{}".to_string()),
                }
            }
        };
        events.push(MessageStreamEvent::ContentBlockDelta {
            index: self.index,
            delta,
        });
    }

    fn finish(
        &mut self,
        reason: Option<FinishReason>,
        usage: Option<&UsageMetadata>,
        events: &mut Vec<MessageStreamEvent>,
    ) {
        if self.finished {
            return;
        }
        self.finished = true;

        let ended_with_tool_use = self.open_block == Some(BlockKind::ToolUse);
        if self.open_block.is_some() {
            events.push(MessageStreamEvent::ContentBlockStop { index: self.index });
            self.open_block = None;
        }

        let stop_reason = if ended_with_tool_use {
            ccgw_protocol::claude::StopReason::ToolUse
        } else {
            map_finish_reason(reason)
        };

        events.push(MessageStreamEvent::MessageDelta {
            delta: MessageDeltaPayload {
                stop_reason: Some(stop_reason),
                stop_sequence: None,
            },
            usage: MessageUsage {
                input_tokens: 0,
                output_tokens: usage.and_then(|usage| usage.candidates_token_count).unwrap_or(0),
            },
        });
        events.push(MessageStreamEvent::MessageStop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccgw_protocol::claude::StopReason;
    use ccgw_protocol::gemini::{Candidate, Content, ContentRole, FunctionCall};

    fn text_chunk(text: &str) -> GenerateContentResponse {
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
    fn matches_scenario_three_text_then_tool_use() {
        let mut state = GeminiToClaudeStreamState::new(FormatterContext::new_claude("gemini-2.5-pro"));

        let events_one = state.on_chunk(&text_chunk("Let me check. "));
        let names: Vec<&str> = events_one.iter().map(|event| event.event_name()).collect();
        assert_eq!(names, vec!["message_start", "content_block_start", "content_block_delta"]);

        let mut chunk_two = GenerateContentResponse {
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
        chunk_two.candidates[0].finish_reason = Some(FinishReason::ToolUse);
        let events_two = state.on_chunk(&chunk_two);
        let names: Vec<&str> = events_two.iter().map(|event| event.event_name()).collect();
        assert_eq!(
            names,
            vec![
                "content_block_stop",
                "content_block_start",
                "content_block_delta",
                "content_block_stop",
                "message_delta",
                "message_stop",
            ]
        );

        if let MessageStreamEvent::MessageDelta { delta, .. } = &events_two[4] {
            assert_eq!(delta.stop_reason, Some(StopReason::ToolUse));
        } else {
            panic!("expected message_delta event");
        }
    }

    #[test]
    fn finish_without_reason_still_closes_an_open_block() {
        let mut state = GeminiToClaudeStreamState::new(FormatterContext::new_claude("gemini-2.5-pro"));
        state.on_chunk(&text_chunk("partial"));
        let events = state.finish_without_reason();
        let names: Vec<&str> = events.iter().map(|event| event.event_name()).collect();
        assert_eq!(names, vec!["content_block_stop", "message_delta", "message_stop"]);
    }
}
