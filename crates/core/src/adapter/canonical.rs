//! Canonical-echo adapter.
//!
//! Speaks the gateway's own [`Request`]/[`Response`] schema directly: no
//! translation layer. Two uses: an in-process test double (the
//! integration suite constructs one with a fixed response), and
//! gateway-to-gateway federation where the upstream is itself a
//! canonical-schema HTTP endpoint.

use async_trait::async_trait;
use config::CanonicalAdapterConfig;
use secrecy::ExposeSecret;

use super::http_client::http_client;
use super::{AdapterKind, AdapterSpec, EventStream};
use crate::error::{GatewayError, Result};
use crate::request_context::RequestContext;
use crate::schema::{Request, Response};
use crate::stream::synthesize_stream;

pub struct CanonicalAdapter {
    name: String,
    config: CanonicalAdapterConfig,
    /// Fixed response used when no `base_url` is configured: an
    /// in-process double for tests.
    fixed_response: Option<Response>,
}

impl CanonicalAdapter {
    pub fn new(name: impl Into<String>, config: CanonicalAdapterConfig) -> Self {
        Self {
            name: name.into(),
            config,
            fixed_response: None,
        }
    }

    /// Build an in-process test double that always returns `response`,
    /// ignoring `base_url` entirely.
    pub fn fixed(name: impl Into<String>, response: Response) -> Self {
        Self {
            name: name.into(),
            config: CanonicalAdapterConfig::default(),
            fixed_response: Some(response),
        }
    }
}

#[async_trait]
impl super::Adapter for CanonicalAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, ctx: &RequestContext, req: &Request) -> Result<Response> {
        if let Some(response) = &self.fixed_response {
            let mut response = response.clone();
            response.model = req.model.clone();
            return Ok(response);
        }

        let Some(base_url) = &self.config.base_url else {
            return Err(GatewayError::Configuration(format!(
                "canonical adapter '{}' has no base_url and no fixed response",
                self.name
            )));
        };

        let url = format!("{}/complete", base_url.as_str().trim_end_matches('/'));
        let mut builder = http_client().post(&url).json(req);

        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }
        if let Some(remaining) = ctx.remaining() {
            builder = builder.timeout(remaining);
        }

        let response = builder.send().await.map_err(|source| GatewayError::Transport {
            adapter: self.name.clone(),
            source,
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Protocol {
                adapter: self.name.clone(),
                message: format!("HTTP {status}: {text}"),
            });
        }

        response.json::<Response>().await.map_err(|source| GatewayError::Transport {
            adapter: self.name.clone(),
            source,
        })
    }

    async fn stream(&self, ctx: &RequestContext, req: &Request) -> Result<EventStream> {
        let response = self.complete(ctx, req).await?;
        let events = synthesize_stream(&response);
        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn admin_spec(&self) -> AdapterSpec {
        AdapterSpec {
            name: self.name.clone(),
            kind: AdapterKind::Canonical,
            supports_streaming: true,
            supports_tools: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Adapter;
    use crate::schema::{ResponseBlock, StopReason, Usage};

    fn echo_response() -> Response {
        Response {
            model: "placeholder".into(),
            blocks: vec![ResponseBlock::Text { text: "fixed answer".into() }],
            stop_reason: StopReason::EndTurn,
            usage: Usage {
                input_tokens: 1,
                output_tokens: 1,
            },
            trace: Default::default(),
        }
    }

    #[tokio::test]
    async fn fixed_adapter_echoes_request_model() {
        let adapter = CanonicalAdapter::fixed("double", echo_response());
        let ctx = RequestContext::default();
        let req = Request {
            run_id: "r1".into(),
            model: "my-model".into(),
            max_tokens: 10,
            system: None,
            messages: Vec::new(),
            tools: Vec::new(),
            metadata: Default::default(),
            headers: Default::default(),
            stream: false,
        };

        let response = adapter.complete(&ctx, &req).await.unwrap();
        assert_eq!(response.model, "my-model");
        assert_eq!(response.text(), "fixed answer");
    }
}
