//! Translation between OpenAI/Anthropic wire formats and the canonical
//! schema. Intentionally thin: each DTO carries just enough of its
//! protocol's shape to round-trip a chat request/response, not a full
//! reimplementation of either provider's API surface.

use std::collections::HashMap;

use gateway_core::{Content, ContentBlock, Message, Request, Response, Role, StopReason, SystemPrompt, ToolDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---- OpenAI: POST /v1/chat/completions ----------------------------------

#[derive(Debug, Deserialize)]
pub struct OpenAiChatRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub tools: Vec<OpenAiTool>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<OpenAiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OpenAiContent {
    Text(String),
    Parts(Vec<OpenAiContentPart>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenAiContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAiImageUrl },
}

#[derive(Debug, Deserialize)]
pub struct OpenAiImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: OpenAiFunction,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiFunction {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "parameters")]
    pub input_schema: Value,
}

fn default_max_tokens() -> u32 {
    1024
}

impl OpenAiChatRequest {
    pub fn into_canonical(self) -> Request {
        let mut system_parts = Vec::new();
        let mut messages = Vec::new();

        for message in self.messages {
            let text = flatten_openai_content(message.content);
            match message.role.as_str() {
                "system" | "developer" => system_parts.push(text),
                "assistant" => messages.push(Message { role: Role::Assistant, content: Content::Text(text) }),
                "tool" => messages.push(Message { role: Role::Tool, content: Content::Text(text) }),
                _ => messages.push(Message { role: Role::User, content: Content::Text(text) }),
            }
        }

        let system = if system_parts.is_empty() { None } else { Some(SystemPrompt::Parts(system_parts)) };

        let tools = self
            .tools
            .into_iter()
            .map(|t| ToolDefinition {
                name: t.function.name,
                description: t.function.description,
                input_schema: t.function.input_schema,
            })
            .collect();

        Request {
            run_id: Uuid::new_v4().to_string(),
            model: self.model,
            max_tokens: self.max_tokens,
            system,
            messages,
            tools,
            metadata: self.metadata,
            headers: HashMap::new(),
            stream: self.stream,
        }
    }
}

fn flatten_openai_content(content: Option<OpenAiContent>) -> String {
    match content {
        None => String::new(),
        Some(OpenAiContent::Text(text)) => text,
        Some(OpenAiContent::Parts(parts)) => parts
            .into_iter()
            .filter_map(|part| match part {
                OpenAiContentPart::Text { text } => Some(text),
                OpenAiContentPart::ImageUrl { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[derive(Debug, Serialize)]
pub struct OpenAiChatResponse {
    pub id: String,
    pub object: &'static str,
    pub model: String,
    pub choices: Vec<OpenAiChoice>,
    pub usage: OpenAiUsage,
}

#[derive(Debug, Serialize)]
pub struct OpenAiChoice {
    pub index: u32,
    pub message: OpenAiResponseMessage,
    pub finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OpenAiResponseMessage {
    pub role: &'static str,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<OpenAiToolCall>,
}

#[derive(Debug, Serialize)]
pub struct OpenAiToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: OpenAiToolCallFunction,
}

#[derive(Debug, Serialize)]
pub struct OpenAiToolCallFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Serialize)]
pub struct OpenAiUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<Response> for OpenAiChatResponse {
    fn from(response: Response) -> Self {
        let tool_calls = response
            .blocks
            .iter()
            .filter_map(|b| match b {
                gateway_core::ResponseBlock::ToolUse { id, name, input } => Some(OpenAiToolCall {
                    id: id.clone(),
                    kind: "function",
                    function: OpenAiToolCallFunction {
                        name: name.clone(),
                        arguments: serde_json::to_string(input).unwrap_or_default(),
                    },
                }),
                _ => None,
            })
            .collect();

        let finish_reason = match response.stop_reason {
            StopReason::EndTurn => "stop",
            StopReason::ToolUse => "tool_calls",
            StopReason::MaxTokens => "length",
            StopReason::StopSequence => "stop",
        };

        OpenAiChatResponse {
            id: format!("chatcmpl-{}", Uuid::new_v4()),
            object: "chat.completion",
            model: response.model,
            choices: vec![OpenAiChoice {
                index: 0,
                message: OpenAiResponseMessage {
                    role: "assistant",
                    content: response.text(),
                    tool_calls,
                },
                finish_reason,
            }],
            usage: OpenAiUsage {
                prompt_tokens: response.usage.input_tokens,
                completion_tokens: response.usage.output_tokens,
                total_tokens: response.usage.input_tokens + response.usage.output_tokens,
            },
        }
    }
}

// ---- Anthropic: POST /v1/messages ---------------------------------------

#[derive(Debug, Deserialize)]
pub struct AnthropicMessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(default)]
    pub system: Option<AnthropicSystem>,
    pub messages: Vec<AnthropicMessage>,
    #[serde(default)]
    pub tools: Vec<AnthropicTool>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AnthropicSystem {
    Text(String),
    Parts(Vec<AnthropicTextBlock>),
}

#[derive(Debug, Deserialize)]
pub struct AnthropicTextBlock {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: AnthropicContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AnthropicContent {
    Text(String),
    Blocks(Vec<Value>),
}

#[derive(Debug, Deserialize)]
pub struct AnthropicTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub input_schema: Value,
}

impl AnthropicMessagesRequest {
    pub fn into_canonical(self) -> Request {
        let system = match self.system {
            None => None,
            Some(AnthropicSystem::Text(text)) => Some(SystemPrompt::Text(text)),
            Some(AnthropicSystem::Parts(parts)) => Some(SystemPrompt::Parts(parts.into_iter().map(|p| p.text).collect())),
        };

        let messages = self
            .messages
            .into_iter()
            .map(|m| {
                let role = if m.role == "assistant" { Role::Assistant } else { Role::User };
                let content = match m.content {
                    AnthropicContent::Text(text) => Content::Text(text),
                    AnthropicContent::Blocks(blocks) => {
                        Content::Blocks(blocks.into_iter().filter_map(anthropic_block_to_canonical).collect())
                    }
                };
                Message { role, content }
            })
            .collect();

        let tools = self
            .tools
            .into_iter()
            .map(|t| ToolDefinition {
                name: t.name,
                description: t.description,
                input_schema: t.input_schema,
            })
            .collect();

        Request {
            run_id: Uuid::new_v4().to_string(),
            model: self.model,
            max_tokens: self.max_tokens,
            system,
            messages,
            tools,
            metadata: self.metadata,
            headers: HashMap::new(),
            stream: self.stream,
        }
    }
}

fn anthropic_block_to_canonical(value: Value) -> Option<ContentBlock> {
    let kind = value.get("type")?.as_str()?;
    match kind {
        "text" => Some(ContentBlock::Text { text: value.get("text")?.as_str()?.to_string() }),
        "tool_result" => Some(ContentBlock::ToolResult {
            tool_use_id: value.get("tool_use_id")?.as_str()?.to_string(),
            content: value
                .get("content")
                .and_then(|c| c.as_str().map(str::to_string))
                .unwrap_or_else(|| value.get("content").map(|c| c.to_string()).unwrap_or_default()),
        }),
        "image" => value.get("source").and_then(|s| s.get("data")).and_then(|d| d.as_str()).map(|url| ContentBlock::ImageUrl { url: url.to_string() }),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct AnthropicMessagesResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub role: &'static str,
    pub model: String,
    pub content: Vec<AnthropicResponseBlock>,
    pub stop_reason: &'static str,
    pub usage: AnthropicUsage,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicResponseBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

#[derive(Debug, Serialize)]
pub struct AnthropicUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl From<Response> for AnthropicMessagesResponse {
    fn from(response: Response) -> Self {
        let content = response
            .blocks
            .into_iter()
            .map(|b| match b {
                gateway_core::ResponseBlock::Text { text } => AnthropicResponseBlock::Text { text },
                gateway_core::ResponseBlock::ToolUse { id, name, input } => AnthropicResponseBlock::ToolUse { id, name, input },
            })
            .collect();

        let stop_reason = match response.stop_reason {
            StopReason::EndTurn => "end_turn",
            StopReason::ToolUse => "tool_use",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
        };

        AnthropicMessagesResponse {
            id: format!("msg_{}", Uuid::new_v4()),
            kind: "message",
            role: "assistant",
            model: response.model,
            content,
            stop_reason,
            usage: AnthropicUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        }
    }
}
