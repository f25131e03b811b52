//! OpenAI `/chat/completions`-dialect adapter.

use async_trait::async_trait;
use config::OpenAiAdapterConfig;
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use super::http_client::http_client;
use super::{AdapterKind, AdapterSpec, EventStream};
use crate::error::{GatewayError, Result};
use crate::request_context::RequestContext;
use crate::schema::{Content, ContentBlock, Message, Request, Response, ResponseBlock, Role, StopReason, Usage};
use crate::stream::synthesize_stream;

pub struct OpenAiAdapter {
    name: String,
    config: OpenAiAdapterConfig,
}

impl OpenAiAdapter {
    pub fn new(name: impl Into<String>, config: OpenAiAdapterConfig) -> Self {
        Self { name: name.into(), config }
    }

    fn build_body(&self, req: &Request) -> Value {
        let mut messages = Vec::with_capacity(req.messages.len() + 1);

        if !req.system_text().is_empty() {
            messages.push(json!({ "role": "system", "content": req.system_text() }));
        }

        for message in &req.messages {
            messages.push(openai_message(message));
        }

        let mut body = json!({
            "model": req.model,
            "messages": messages,
            "max_tokens": req.max_tokens,
        });

        if !req.tools.is_empty() {
            let tools: Vec<Value> = req
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.input_schema,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }

        if let Some(temperature) = req.metadata.get("temperature") {
            body["temperature"] = temperature.clone();
        }
        if let Some(top_p) = req.metadata.get("top_p") {
            body["top_p"] = top_p.clone();
        }

        body
    }

    fn parse_response(&self, model: &str, body: &Value) -> Result<Response> {
        let choice = body["choices"].get(0).ok_or_else(|| GatewayError::Protocol {
            adapter: self.name.clone(),
            message: "response has no choices".to_string(),
        })?;

        let message = &choice["message"];
        let mut blocks = Vec::new();

        if let Some(text) = message["content"].as_str()
            && !text.is_empty()
        {
            blocks.push(ResponseBlock::Text { text: text.to_string() });
        }

        if let Some(tool_calls) = message["tool_calls"].as_array() {
            for call in tool_calls {
                let id = call["id"].as_str().unwrap_or_default().to_string();
                let name = call["function"]["name"].as_str().unwrap_or_default().to_string();
                let args_str = call["function"]["arguments"].as_str().unwrap_or("{}");
                let input: Value = serde_json::from_str(args_str).unwrap_or(Value::Object(Default::default()));
                blocks.push(ResponseBlock::ToolUse { id, name, input });
            }
        }

        let stop_reason = match choice["finish_reason"].as_str() {
            Some("tool_calls") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        };

        let usage = Usage {
            input_tokens: body["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: body["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(Response {
            model: model.to_string(),
            blocks,
            stop_reason,
            usage,
            trace: Default::default(),
        })
    }
}

fn openai_message(message: &Message) -> Value {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    match &message.content {
        Content::Text(text) => json!({ "role": role, "content": text }),
        Content::Blocks(blocks) => {
            if let Some(ContentBlock::ToolResult { tool_use_id, content }) = blocks.iter().find(|b| matches!(b, ContentBlock::ToolResult { .. }))
            {
                return json!({ "role": "tool", "tool_call_id": tool_use_id, "content": content });
            }

            let parts: Vec<Value> = blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(json!({ "type": "text", "text": text })),
                    ContentBlock::ImageUrl { url } => Some(json!({ "type": "image_url", "image_url": { "url": url } })),
                    _ => None,
                })
                .collect();
            json!({ "role": role, "content": parts })
        }
    }
}

#[async_trait]
impl super::Adapter for OpenAiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, ctx: &RequestContext, req: &Request) -> Result<Response> {
        let body = self.build_body(req);
        let url = format!("{}/chat/completions", self.config.base_url.as_str().trim_end_matches('/'));

        let mut builder = http_client().post(&url).json(&body).timeout(self.config.timeout);

        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }
        if let Some(org) = &self.config.organization {
            builder = builder.header("OpenAI-Organization", org.as_str());
        }
        for (name, value) in &self.config.extra_headers {
            builder = builder.header(name, value.as_str());
        }

        let remaining = ctx.remaining();
        if let Some(remaining) = remaining {
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
        self.parse_response(&req.model, &body)
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
            kind: AdapterKind::OpenAi,
            supports_streaming: true,
            supports_tools: true,
        }
    }
}
