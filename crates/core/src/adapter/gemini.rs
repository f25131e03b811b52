//! Gemini `generateContent`-dialect adapter.

use async_trait::async_trait;
use config::GeminiAdapterConfig;
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use super::http_client::http_client;
use super::{AdapterKind, AdapterSpec, EventStream};
use crate::error::{GatewayError, Result};
use crate::request_context::RequestContext;
use crate::schema::{Content, ContentBlock, Message, Request, Response, ResponseBlock, Role, StopReason, Usage};
use crate::stream::synthesize_stream;

pub struct GeminiAdapter {
    name: String,
    config: GeminiAdapterConfig,
}

impl GeminiAdapter {
    pub fn new(name: impl Into<String>, config: GeminiAdapterConfig) -> Self {
        Self { name: name.into(), config }
    }

    fn build_body(&self, req: &Request) -> Value {
        let contents: Vec<Value> = req.messages.iter().map(gemini_content).collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": { "maxOutputTokens": req.max_tokens },
        });

        if !req.system_text().is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": req.system_text() }] });
        }

        if !req.tools.is_empty() {
            let declarations: Vec<Value> = req
                .tools
                .iter()
                .map(|t| json!({ "name": t.name, "description": t.description, "parameters": t.input_schema }))
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        body
    }

    fn parse_response(&self, model: &str, body: &Value) -> Result<Response> {
        let candidate = body["candidates"].get(0).ok_or_else(|| GatewayError::Protocol {
            adapter: self.name.clone(),
            message: "response has no candidates".to_string(),
        })?;

        let parts = candidate["content"]["parts"].as_array().cloned().unwrap_or_default();
        let mut blocks = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            if let Some(text) = part["text"].as_str() {
                blocks.push(ResponseBlock::Text { text: text.to_string() });
            } else if let Some(call) = part.get("functionCall") {
                blocks.push(ResponseBlock::ToolUse {
                    id: format!("call_{i}"),
                    name: call["name"].as_str().unwrap_or_default().to_string(),
                    input: call["args"].clone(),
                });
            }
        }

        let stop_reason = match candidate["finishReason"].as_str() {
            Some("MAX_TOKENS") => StopReason::MaxTokens,
            Some("STOP") if blocks.iter().any(|b| matches!(b, ResponseBlock::ToolUse { .. })) => StopReason::ToolUse,
            _ => StopReason::EndTurn,
        };

        let usage = Usage {
            input_tokens: body["usageMetadata"]["promptTokenCount"].as_u64().unwrap_or(0) as u32,
            output_tokens: body["usageMetadata"]["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
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

fn gemini_content(message: &Message) -> Value {
    let role = match message.role {
        Role::User | Role::Tool => "user",
        Role::Assistant => "model",
    };

    let parts: Vec<Value> = match &message.content {
        Content::Text(text) => vec![json!({ "text": text })],
        Content::Blocks(blocks) => blocks
            .iter()
            .map(|b| match b {
                ContentBlock::Text { text } => json!({ "text": text }),
                ContentBlock::ImageUrl { url } => json!({ "fileData": { "fileUri": url } }),
                ContentBlock::ToolUse { name, input, .. } => json!({ "functionCall": { "name": name, "args": input } }),
                ContentBlock::ToolResult { content, .. } => json!({ "text": content }),
            })
            .collect(),
    };

    json!({ "role": role, "parts": parts })
}

#[async_trait]
impl super::Adapter for GeminiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, ctx: &RequestContext, req: &Request) -> Result<Response> {
        let body = self.build_body(req);
        let key = self.config.api_key.as_ref().map(|k| k.expose_secret().to_string()).unwrap_or_default();
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url.as_str().trim_end_matches('/'),
            req.model,
            key
        );

        let mut builder = http_client().post(&url).json(&body).timeout(self.config.timeout);

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
            kind: AdapterKind::Gemini,
            supports_streaming: true,
            supports_tools: true,
        }
    }
}
