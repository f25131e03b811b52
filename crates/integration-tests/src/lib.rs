//! In-process test doubles for exercising the gateway core end to end,
//! without any real upstream adapter.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use gateway_core::{
    Adapter, AdapterKind, AdapterSpec, Content, EventStream, GatewayError, Message, Request, Response, ResponseBlock, Result, Role,
    StopReason, Trace, Usage,
};

/// An adapter that always fails with the given error text, for
/// exercising failover.
pub struct FailingAdapter {
    name: String,
    message: String,
}

impl FailingAdapter {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), message: message.into() }
    }
}

#[async_trait]
impl Adapter for FailingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _ctx: &gateway_core::RequestContext, _req: &Request) -> Result<Response> {
        Err(GatewayError::Protocol {
            adapter: self.name.clone(),
            message: self.message.clone(),
        })
    }

    fn admin_spec(&self) -> AdapterSpec {
        AdapterSpec {
            name: self.name.clone(),
            kind: AdapterKind::Canonical,
            supports_streaming: false,
            supports_tools: false,
        }
    }
}

/// Wraps a fixed response behind an artificial delay, so judge/latency
/// scenarios can be reproduced deterministically.
pub struct DelayedAdapter {
    name: String,
    response: Response,
    delay: Duration,
}

impl DelayedAdapter {
    pub fn new(name: impl Into<String>, response: Response, delay: Duration) -> Self {
        Self { name: name.into(), response, delay }
    }
}

#[async_trait]
impl Adapter for DelayedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _ctx: &gateway_core::RequestContext, req: &Request) -> Result<Response> {
        tokio::time::sleep(self.delay).await;
        let mut response = self.response.clone();
        response.model = req.model.clone();
        Ok(response)
    }

    fn admin_spec(&self) -> AdapterSpec {
        AdapterSpec {
            name: self.name.clone(),
            kind: AdapterKind::Canonical,
            supports_streaming: false,
            supports_tools: false,
        }
    }
}

/// An adapter that always errors with `ErrStrictPassthroughUnsupported`
/// on streaming, but completes normally, for soft-fallback scenarios.
pub struct NoPassthroughAdapter {
    name: String,
    response: Response,
}

impl NoPassthroughAdapter {
    pub fn new(name: impl Into<String>, response: Response) -> Self {
        Self { name: name.into(), response }
    }
}

#[async_trait]
impl Adapter for NoPassthroughAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _ctx: &gateway_core::RequestContext, req: &Request) -> Result<Response> {
        let mut response = self.response.clone();
        response.model = req.model.clone();
        Ok(response)
    }

    async fn stream(&self, _ctx: &gateway_core::RequestContext, _req: &Request) -> Result<EventStream> {
        Err(GatewayError::StrictPassthroughUnsupported { adapter: self.name.clone() })
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn admin_spec(&self) -> AdapterSpec {
        AdapterSpec {
            name: self.name.clone(),
            kind: AdapterKind::Anthropic,
            supports_streaming: true,
            supports_tools: false,
        }
    }
}

/// Build a minimal single-turn user request against `model`.
pub fn user_request(model: &str, text: &str, max_tokens: u32) -> Request {
    Request {
        run_id: "test-run".to_string(),
        model: model.to_string(),
        max_tokens,
        system: None,
        messages: vec![Message {
            role: Role::User,
            content: Content::Text(text.to_string()),
        }],
        tools: Vec::new(),
        metadata: HashMap::new(),
        headers: HashMap::new(),
        stream: false,
    }
}

/// Same as [`user_request`] but carrying one tool definition, for
/// tool-probe gating scenarios.
pub fn user_request_with_tool(model: &str, text: &str) -> Request {
    let mut req = user_request(model, text, 128);
    req.tools.push(gateway_core::ToolDefinition {
        name: "get_weather".to_string(),
        description: "Get the current weather for a named location.".to_string(),
        input_schema: serde_json::json!({"type": "object"}),
    });
    req
}

/// A single-block text response with empty trace, for adapters to hand
/// back as their fixed answer.
pub fn fixed_response(text: &str) -> Response {
    Response {
        model: String::new(),
        blocks: vec![ResponseBlock::Text { text: text.to_string() }],
        stop_reason: StopReason::EndTurn,
        usage: Usage {
            input_tokens: 8,
            output_tokens: text.len() as u32 / 4,
        },
        trace: Trace::default(),
    }
}
