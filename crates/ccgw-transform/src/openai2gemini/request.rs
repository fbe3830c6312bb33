use ccgw_protocol::gemini::{
    Content, ContentRole, FunctionCall, FunctionCallingConfig, FunctionCallingMode,
    FunctionDeclaration, FunctionResponse, GenerateContentRequestBody, GenerationConfig, Part,
    Tool, ToolConfig, default_safety_settings,
};
use ccgw_protocol::openai::{
    ChatCompletionContent, ChatCompletionContentPart, ChatCompletionRequestMessage,
    ChatCompletionResponseFormatType, ChatCompletionRole, ChatCompletionToolChoice,
    CreateChatCompletionRequest,
};

use crate::sanitize::sanitize_schema;

/// Converts an OpenAI chat-completions request into a canonical Gemini
/// request body (spec §4.5 "OpenAI chat"). Model routing is handled by the
/// caller; this only builds the body.
pub fn transform_request(
    request: &CreateChatCompletionRequest,
    unsupported_schema_keys: &[String],
) -> GenerateContentRequestBody {
    let mut system_texts = Vec::new();
    let mut contents = Vec::new();

    for message in &request.messages {
        match message.role {
            ChatCompletionRole::System => {
                if let Some(text) = message.content.as_ref().and_then(ChatCompletionContent::as_text) {
                    system_texts.push(text.to_string());
                }
            }
            ChatCompletionRole::Assistant => {
                if let Some(content) = map_assistant_message(message) {
                    contents.push(content);
                }
            }
            ChatCompletionRole::Tool => {
                contents.push(map_tool_message(message));
            }
            ChatCompletionRole::User => {
                if let Some(content) = map_user_message(message) {
                    contents.push(content);
                }
            }
        }
    }

    let system_instruction = if system_texts.is_empty() {
        None
    } else {
        Some(Content {
            parts: vec![Part::text(system_texts.join("\n"))],
            role: None,
        })
    };

    let tools = request.tools.as_ref().map(|tools| {
        let function_declarations = tools
            .iter()
            .map(|tool| {
                let parameters = tool
                    .function
                    .parameters
                    .as_ref()
                    .map(|schema| sanitize_schema(schema, unsupported_schema_keys));
                FunctionDeclaration {
                    name: tool.function.name.clone(),
                    description: tool.function.description.clone(),
                    parameters,
                }
            })
            .collect();
        vec![Tool {
            function_declarations: Some(function_declarations),
        }]
    });

    let tool_config = request.tool_choice.as_ref().map(map_tool_choice);

    let generation_config = map_generation_config(request);

    GenerateContentRequestBody {
        contents,
        system_instruction,
        tools,
        tool_config,
        safety_settings: Some(default_safety_settings()),
        generation_config,
    }
}

fn map_user_message(message: &ChatCompletionRequestMessage) -> Option<Content> {
    let mut parts = Vec::new();
    match message.content.as_ref() {
        Some(ChatCompletionContent::Text(text)) => parts.push(Part::text(text.clone())),
        Some(ChatCompletionContent::Parts(items)) => {
            for item in items {
                match item {
                    ChatCompletionContentPart::Text { text } => parts.push(Part::text(text.clone())),
                    ChatCompletionContentPart::ImageUrl { image_url } => {
                        match parse_data_url(&image_url.url) {
                            Some((mime, data)) => {
                                parts.push(Part::inline_data(ccgw_protocol::gemini::Blob {
                                    mime_type: mime,
                                    data,
                                }));
                            }
                            None => {
                                tracing::warn!(
                                    url = %image_url.url,
                                    "dropping image_url content part not shaped as a base64 data URI"
                                );
                            }
                        }
                    }
                }
            }
        }
        None => {}
    }
    if parts.is_empty() {
        None
    } else {
        Some(Content {
            parts,
            role: Some(ContentRole::User),
        })
    }
}

fn map_assistant_message(message: &ChatCompletionRequestMessage) -> Option<Content> {
    let mut parts = Vec::new();

    if let Some(text) = message.content.as_ref().and_then(ChatCompletionContent::as_text) {
        if !text.is_empty() {
            parts.push(Part::text(text.to_string()));
        }
    }

    if let Some(tool_calls) = &message.tool_calls {
        for call in tool_calls {
            let args = serde_json::from_str(&call.function.arguments).unwrap_or_else(|error| {
                tracing::warn!(%error, "assistant tool_call arguments are not valid JSON, defaulting to {{}}");
                serde_json::json!({})
            });
            parts.push(Part::function_call(FunctionCall {
                id: Some(call.id.clone()),
                name: call.function.name.clone(),
                args: Some(args),
            }));
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(Content {
            parts,
            role: Some(ContentRole::Model),
        })
    }
}

fn map_tool_message(message: &ChatCompletionRequestMessage) -> Content {
    let content = message
        .content
        .as_ref()
        .and_then(ChatCompletionContent::as_text)
        .unwrap_or_default()
        .to_string();
    let tool_call_id = message.tool_call_id.clone().unwrap_or_default();
    Content {
        parts: vec![Part::function_response(FunctionResponse {
            id: None,
            name: tool_call_id,
            response: serde_json::json!({"content": content}),
        })],
        role: Some(ContentRole::Tool),
    }
}

fn map_tool_choice(choice: &ChatCompletionToolChoice) -> ToolConfig {
    let config = match choice {
        ChatCompletionToolChoice::Mode(mode) => match mode.as_str() {
            "none" => FunctionCallingConfig {
                mode: FunctionCallingMode::None,
                allowed_function_names: None,
            },
            "required" => FunctionCallingConfig {
                mode: FunctionCallingMode::Any,
                allowed_function_names: None,
            },
            _ => FunctionCallingConfig {
                mode: FunctionCallingMode::Auto,
                allowed_function_names: None,
            },
        },
        ChatCompletionToolChoice::Named(named) => FunctionCallingConfig {
            mode: FunctionCallingMode::Any,
            allowed_function_names: Some(vec![named.function.name.clone()]),
        },
    };
    ToolConfig {
        function_calling_config: config,
    }
}

fn map_generation_config(request: &CreateChatCompletionRequest) -> Option<GenerationConfig> {
    let stop_sequences = request.stop.clone().map(|stop| stop.into_vec());
    let response_mime_type = match request.response_format.as_ref().map(|format| format.r#type) {
        Some(ChatCompletionResponseFormatType::JsonObject) => Some("application/json".to_string()),
        _ => None,
    };

    let config = GenerationConfig {
        temperature: request.temperature,
        top_p: request.top_p,
        top_k: None,
        max_output_tokens: request.max_tokens,
        stop_sequences,
        frequency_penalty: request.frequency_penalty,
        presence_penalty: request.presence_penalty,
        candidate_count: request.n,
        seed: request.seed,
        response_mime_type,
    };

    if config == GenerationConfig::default() {
        None
    } else {
        Some(config)
    }
}

fn parse_data_url(url: &str) -> Option<(String, String)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, data) = rest.split_once(',')?;
    let (mime, encoding) = meta.split_once(';')?;
    if encoding != "base64" {
        return None;
    }
    Some((mime.to_string(), data.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccgw_protocol::openai::{ChatCompletionRequestMessage, ChatCompletionRole};

    fn message(role: ChatCompletionRole, text: &str) -> ChatCompletionRequestMessage {
        ChatCompletionRequestMessage {
            role,
            content: Some(ChatCompletionContent::Text(text.to_string())),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    #[test]
    fn leading_system_message_becomes_system_instruction() {
        let request = CreateChatCompletionRequest {
            model: "gemini-2.5-pro".to_string(),
            messages: vec![
                message(ChatCompletionRole::System, "be terse"),
                message(ChatCompletionRole::User, "hi"),
            ],
            temperature: None,
            top_p: None,
            max_tokens: None,
            stop: None,
            frequency_penalty: None,
            presence_penalty: None,
            n: None,
            seed: None,
            response_format: None,
            tools: None,
            tool_choice: None,
            stream: false,
        };
        let body = transform_request(&request, &[]);
        assert_eq!(
            body.system_instruction.unwrap().parts[0].as_text(),
            Some("be terse")
        );
        assert_eq!(body.contents.len(), 1);
        assert_eq!(body.contents[0].role, Some(ContentRole::User));
    }

    #[test]
    fn malformed_tool_call_arguments_default_to_empty_object() {
        let mut assistant = message(ChatCompletionRole::Assistant, "");
        assistant.content = None;
        assistant.tool_calls = Some(vec![ccgw_protocol::openai::ChatCompletionMessageToolCall {
            id: "call_1".to_string(),
            r#type: Some("function".to_string()),
            function: ccgw_protocol::openai::ChatCompletionMessageToolCallFunction {
                name: "lookup".to_string(),
                arguments: "not json".to_string(),
            },
        }]);
        let request = CreateChatCompletionRequest {
            model: "gemini-2.5-pro".to_string(),
            messages: vec![assistant],
            temperature: None,
            top_p: None,
            max_tokens: None,
            stop: None,
            frequency_penalty: None,
            presence_penalty: None,
            n: None,
            seed: None,
            response_format: None,
            tools: None,
            tool_choice: None,
            stream: false,
        };
        let body = transform_request(&request, &[]);
        let call = body.contents[0].parts[0].as_function_call().unwrap();
        assert_eq!(call.args, Some(serde_json::json!({})));
    }

    #[test]
    fn message_with_only_invalid_image_url_is_omitted_entirely() {
        let request = CreateChatCompletionRequest {
            model: "gemini-2.5-pro".to_string(),
            messages: vec![ChatCompletionRequestMessage {
                role: ChatCompletionRole::User,
                content: Some(ChatCompletionContent::Parts(vec![
                    ChatCompletionContentPart::ImageUrl {
                        image_url: ccgw_protocol::openai::ChatCompletionImageUrl {
                            url: "https://example.com/x.png".to_string(),
                        },
                    },
                ])),
                name: None,
                tool_calls: None,
                tool_call_id: None,
            }],
            temperature: None,
            top_p: None,
            max_tokens: None,
            stop: None,
            frequency_penalty: None,
            presence_penalty: None,
            n: None,
            seed: None,
            response_format: None,
            tools: None,
            tool_choice: None,
            stream: false,
        };
        let body = transform_request(&request, &[]);
        assert!(body.contents.is_empty());
    }
}
