//! Anthropic Messages-dialect adapter.

use async_trait::async_trait;
use config::AnthropicAdapterConfig;
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use super::http_client::http_client;
use super::{AdapterKind, AdapterSpec, EventStream};
use crate::error::{GatewayError, Result};
use crate::request_context::RequestContext;
use crate::schema::{Content, ContentBlock, Message, Request, Response, ResponseBlock, Role, StopReason, Usage};
use crate::stream::synthesize_stream;

pub struct AnthropicAdapter {
    name: String,
    config: AnthropicAdapterConfig,
}

impl AnthropicAdapter {
    pub fn new(name: impl Into<String>, config: AnthropicAdapterConfig) -> Self {
        Self { name: name.into(), config }
    }

    fn build_body(&self, req: &Request) -> Value {
        let messages: Vec<Value> = req.messages.iter().map(anthropic_message).collect();

        let mut body = json!({
            "model": req.model,
            "max_tokens": req.max_tokens,
            "messages": messages,
        });

        if !req.system_text().is_empty() {
            body["system"] = json!(req.system_text());
        }

        if !req.tools.is_empty() {
            let tools: Vec<Value> = req
                .tools
                .iter()
                .map(|t| json!({ "name": t.name, "description": t.description, "input_schema": t.input_schema }))
                .collect();
            body["tools"] = Value::Array(tools);
        }

        if let Some(temperature) = req.metadata.get("temperature") {
            body["temperature"] = temperature.clone();
        }

        body
    }

    fn parse_response(&self, body: &Value) -> Result<Response> {
        let model = body["model"].as_str().unwrap_or_default().to_string();

        let content = body["content"].as_array().ok_or_else(|| GatewayError::Protocol {
            adapter: self.name.clone(),
            message: "response has no content".to_string(),
        })?;

        let mut blocks = Vec::with_capacity(content.len());
        for block in content {
            match block["type"].as_str() {
                Some("text") => blocks.push(ResponseBlock::Text {
                    text: block["text"].as_str().unwrap_or_default().to_string(),
                }),
                Some("tool_use") => blocks.push(ResponseBlock::ToolUse {
                    id: block["id"].as_str().unwrap_or_default().to_string(),
                    name: block["name"].as_str().unwrap_or_default().to_string(),
                    input: block["input"].clone(),
                }),
                _ => {}
            }
        }

        let stop_reason = match body["stop_reason"].as_str() {
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        };

        let usage = Usage {
            input_tokens: body["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: body["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(Response {
            model,
            blocks,
            stop_reason,
            usage,
            trace: Default::default(),
        })
    }
}

fn anthropic_message(message: &Message) -> Value {
    let role = match message.role {
        Role::User | Role::Tool => "user",
        Role::Assistant => "assistant",
    };

    let content = match &message.content {
        Content::Text(text) => json!(text),
        Content::Blocks(blocks) => {
            let parts: Vec<Value> = blocks
                .iter()
                .map(|b| match b {
                    ContentBlock::Text { text } => json!({ "type": "text", "text": text }),
                    ContentBlock::ImageUrl { url } => json!({ "type": "image", "source": { "type": "url", "url": url } }),
                    ContentBlock::ToolUse { id, name, input } => json!({ "type": "tool_use", "id": id, "name": name, "input": input }),
                    ContentBlock::ToolResult { tool_use_id, content } => {
                        json!({ "type": "tool_result", "tool_use_id": tool_use_id, "content": content })
                    }
                })
                .collect();
            Value::Array(parts)
        }
    };

    json!({ "role": role, "content": content })
}

#[async_trait]
impl super::Adapter for AnthropicAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, ctx: &RequestContext, req: &Request) -> Result<Response> {
        let body = self.build_body(req);
        let url = format!("{}/messages", self.config.base_url.as_str().trim_end_matches('/'));

        let mut builder = http_client()
            .post(&url)
            .json(&body)
            .header("anthropic-version", &self.config.anthropic_version)
            .timeout(self.config.timeout);

        if let Some(key) = &self.config.api_key {
            builder = builder.header("x-api-key", key.expose_secret());
        }
        for (name, value) in &self.config.extra_headers {
            builder = builder.header(name, value.as_str());
        }

        if let Some(remaining) = ctx.remaining() {
            builder = builder.timeout(remaining.min(self.config.timeout));
        }

        let response = builder.send().await.map_err(|source| GatewayError::Transport {
            adapter: self.name.clone(),
            source,
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| GatewayError::Transport {
            adapter: self.name.clone(),
            source,
        })?;

        if !status.is_success() {
            if GatewayError::looks_like_model_not_found(&text) {
                return Err(GatewayError::ModelNotFound {
                    adapter: self.name.clone(),
                    model: req.model.clone(),
                });
            }
            return Err(GatewayError::Protocol {
                adapter: self.name.clone(),
                message: format!("HTTP {status}: {text}"),
            });
        }

        let body: Value = serde_json::from_str(&text)?;
        self.parse_response(&body)
    }

    async fn stream(&self, ctx: &RequestContext, req: &Request) -> Result<EventStream> {
        let response = self.complete(ctx, req).await?;
        let events = synthesize_stream(&response);
        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn model_hint(&self) -> Option<Vec<String>> {
        self.config.models.clone()
    }

    fn admin_spec(&self) -> AdapterSpec {
        AdapterSpec {
            name: self.name.clone(),
            kind: AdapterKind::Anthropic,
            supports_streaming: true,
            supports_tools: true,
        }
    }
}
