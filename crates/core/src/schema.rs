//! Canonical, protocol-agnostic request/response/stream types.
//!
//! Every adapter translates between its provider's wire format and these
//! types. Nothing downstream of an adapter (the scheduler, the judge, the
//! router) ever looks at a provider-specific shape again.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A chat completion / streaming request, independent of upstream protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Correlates a request across adapters, probes and traces.
    pub run_id: String,
    /// Model identifier. May contain a `provider/model` prefix.
    pub model: String,
    /// Maximum tokens the model should generate.
    pub max_tokens: u32,
    /// System prompt, either a single string or ordered text parts.
    pub system: Option<SystemPrompt>,
    /// Conversation so far.
    pub messages: Vec<Message>,
    /// Tools the model may call.
    pub tools: Vec<ToolDefinition>,
    /// Open metadata map; only the keys in `metadata::keys` are interpreted.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Opaque header passthrough for provider-specific headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Whether the caller wants a stream of `StreamEvent`s back.
    #[serde(default)]
    pub stream: bool,
}

impl Request {
    /// Concatenated text of every message, used by the dispatcher's
    /// long-context check.
    pub fn total_message_chars(&self) -> usize {
        self.messages.iter().map(Message::text_len).sum()
    }

    /// Text of the last user message, or empty string if there is none.
    pub fn last_user_text(&self) -> String {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(Message::flattened_text)
            .unwrap_or_default()
    }

    /// System prompt flattened to a single string, empty if absent.
    pub fn system_text(&self) -> String {
        match &self.system {
            Some(SystemPrompt::Text(text)) => text.clone(),
            Some(SystemPrompt::Parts(parts)) => parts.join("\n"),
            None => String::new(),
        }
    }
}

/// System prompt: either a plain string or an ordered list of text parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemPrompt {
    Text(String),
    Parts(Vec<String>),
}

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    fn text_len(&self) -> usize {
        self.flattened_text().len()
    }

    /// Flatten all text blocks (or the plain string) into one string.
    pub fn flattened_text(&self) -> String {
        match &self.content {
            Content::Text(text) => text.clone(),
            Content::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// Message content: a plain string, or an ordered list of typed blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A single typed content block.
///
/// Covers both request-side blocks (`image_url`, `tool_result`) and
/// response-side blocks (`tool_use`); translators switch on the tag and
/// ignore variants that don't apply to the direction they're converting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ImageUrl { url: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult { tool_use_id: String, content: String },
}

/// A tool the model is allowed to call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A completed response from an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub model: String,
    pub blocks: Vec<ResponseBlock>,
    pub stop_reason: StopReason,
    pub usage: Usage,
    #[serde(default)]
    pub trace: Trace,
}

impl Response {
    /// Flattened text of every `Text` block, joined by newlines.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                ResponseBlock::Text { text } => Some(text.as_str()),
                ResponseBlock::ToolUse { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_tool_use(&self) -> bool {
        self.blocks.iter().any(|b| matches!(b, ResponseBlock::ToolUse { .. }))
    }

    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .blocks
            .iter()
            .filter_map(|b| match b {
                ResponseBlock::ToolUse { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn add(&mut self, other: Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Which strategy picked the final response among candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectedBy {
    #[default]
    Single,
    Judge,
    Priority,
}

/// Per-response routing metadata, returned alongside every `Response`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    pub provider: String,
    pub model: String,
    pub fallback_used: bool,
    pub reflection_passes: u32,
    pub selected_by: SelectedBy,
    pub candidate_count: usize,
    pub judge_enabled: bool,
}
