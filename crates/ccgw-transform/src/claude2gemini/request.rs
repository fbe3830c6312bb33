use ccgw_protocol::claude::{
    CreateMessageRequest, InputMessage, MessageContent, MessageContentBlock, MessageRole,
    SystemPrompt,
};
use ccgw_protocol::gemini::{
    Content, ContentRole, FunctionCall, FunctionCallingConfig, FunctionCallingMode,
    FunctionDeclaration, FunctionResponse, GenerateContentRequestBody, GenerationConfig, Part,
    Tool, ToolConfig, default_safety_settings,
};

use crate::sanitize::sanitize_schema;

/// Converts a Claude `messages` request into a canonical Gemini request body
/// (spec §4.5 "Claude messages").
pub fn transform_request(
    request: &CreateMessageRequest,
    unsupported_schema_keys: &[String],
) -> GenerateContentRequestBody {
    let contents = request.messages.iter().map(map_message).collect();

    let system_instruction = request.system.as_ref().map(|system| Content {
        parts: vec![Part::text(system_text(system))],
        role: None,
    });

    let tools = request.tools.as_ref().map(|tools| {
        let function_declarations = tools
            .iter()
            .map(|tool| FunctionDeclaration {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: Some(sanitize_schema(&tool.input_schema, unsupported_schema_keys)),
            })
            .collect();
        vec![Tool {
            function_declarations: Some(function_declarations),
        }]
    });

    let tool_config = if tools.is_some() {
        Some(ToolConfig {
            function_calling_config: FunctionCallingConfig {
                mode: FunctionCallingMode::Auto,
                allowed_function_names: None,
            },
        })
    } else {
        None
    };

    let response_mime_type = match request.response_format.as_ref().map(|format| &format.r#type) {
        Some(format_type) if format_type == "json_object" => Some("application/json".to_string()),
        _ => None,
    };

    let generation_config = Some(GenerationConfig {
        temperature: request.temperature,
        top_p: request.top_p,
        top_k: request.top_k.map(|value| value as f64),
        max_output_tokens: Some(request.max_tokens),
        stop_sequences: request.stop_sequences.clone(),
        frequency_penalty: None,
        presence_penalty: None,
        candidate_count: None,
        seed: None,
        response_mime_type,
    });

    GenerateContentRequestBody {
        contents,
        system_instruction,
        tools,
        tool_config,
        safety_settings: Some(default_safety_settings()),
        generation_config,
    }
}

fn system_text(system: &SystemPrompt) -> String {
    match system {
        SystemPrompt::Text(text) => text.clone(),
        SystemPrompt::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                MessageContentBlock::Text { text } => Some(text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn map_message(message: &InputMessage) -> Content {
    let blocks: Vec<MessageContentBlock> = match &message.content {
        MessageContent::Text(text) => vec![MessageContentBlock::Text { text: text.clone() }],
        MessageContent::Blocks(blocks) => blocks.clone(),
    };

    let has_tool_result = blocks
        .iter()
        .any(|block| matches!(block, MessageContentBlock::ToolResult { .. }));

    let parts = blocks.into_iter().filter_map(map_block).collect();

    let role = if has_tool_result {
        ContentRole::Tool
    } else {
        match message.role {
            MessageRole::Assistant => ContentRole::Model,
            MessageRole::User => ContentRole::User,
        }
    };

    Content {
        parts,
        role: Some(role),
    }
}

fn map_block(block: MessageContentBlock) -> Option<Part> {
    match block {
        MessageContentBlock::Text { text } => Some(Part::text(text)),
        MessageContentBlock::ToolUse { id, name, input } => Some(Part::function_call(FunctionCall {
            id: Some(id),
            name,
            args: Some(input),
        })),
        MessageContentBlock::ToolResult {
            tool_use_id,
            content,
            ..
        } => Some(Part::function_response(FunctionResponse {
            id: None,
            name: tool_use_id,
            response: serde_json::json!({"content": content.unwrap_or(serde_json::Value::Null)}),
        })),
        MessageContentBlock::Image { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_block_recomputes_role_to_tool() {
        let request = CreateMessageRequest {
            model: "gemini-2.5-pro".to_string(),
            messages: vec![InputMessage {
                role: MessageRole::User,
                content: MessageContent::Blocks(vec![MessageContentBlock::ToolResult {
                    tool_use_id: "call_1".to_string(),
                    content: Some(serde_json::json!("42")),
                    is_error: None,
                }]),
            }],
            system: None,
            max_tokens: 256,
            temperature: None,
            top_p: None,
            top_k: None,
            stop_sequences: None,
            tools: None,
            response_format: None,
            stream: false,
        };
        let body = transform_request(&request, &[]);
        assert_eq!(body.contents[0].role, Some(ContentRole::Tool));
    }

    #[test]
    fn string_system_becomes_single_text_instruction() {
        let request = CreateMessageRequest {
            model: "gemini-2.5-pro".to_string(),
            messages: vec![],
            system: Some(SystemPrompt::Text("be terse".to_string())),
            max_tokens: 256,
            temperature: None,
            top_p: None,
            top_k: None,
            stop_sequences: None,
            tools: None,
            response_format: None,
            stream: false,
        };
        let body = transform_request(&request, &[]);
        assert_eq!(
            body.system_instruction.unwrap().parts[0].as_text(),
            Some("be terse")
        );
    }
}
