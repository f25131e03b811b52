//! The adapter contract and its concrete implementations.
//!
//! Adapters are polymorphic over a capability set: every adapter must
//! implement `complete`; `stream`, `model_hint` and `admin_spec` have
//! default implementations so a minimal adapter (the canonical echo
//! adapter, a bare script adapter) only has to implement the one
//! required method.

pub mod anthropic;
pub mod canonical;
pub mod gemini;
pub mod http_client;
pub mod openai;
pub mod script;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::{GatewayError, Result};
use crate::request_context::RequestContext;
use crate::schema::{Request, Response};
use crate::stream::StreamEvent;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Static description of an adapter for admin/introspection surfaces.
#[derive(Debug, Clone)]
pub struct AdapterSpec {
    pub name: String,
    pub kind: AdapterKind,
    pub supports_streaming: bool,
    pub supports_tools: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    OpenAi,
    Anthropic,
    Gemini,
    Canonical,
    Script,
}

/// A concrete integration with a single upstream provider.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, ctx: &RequestContext, req: &Request) -> Result<Response>;

    /// Default: adapter does not support streaming. Adapters that can
    /// stream override this.
    async fn stream(&self, _ctx: &RequestContext, _req: &Request) -> Result<EventStream> {
        Err(GatewayError::StreamingNotSupported {
            adapter: self.name().to_string(),
        })
    }

    fn supports_streaming(&self) -> bool {
        false
    }

    /// Model list the probe runner should default to exercising on this
    /// adapter, if the operator didn't configure one explicitly.
    fn model_hint(&self) -> Option<Vec<String>> {
        None
    }

    fn admin_spec(&self) -> AdapterSpec;
}

/// Minimal single-turn completion surface used by the judge and the
/// reflection loop's critique/fix sub-calls. Any `Adapter` satisfies it.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete_simple(
        &self,
        ctx: &RequestContext,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<String>;
}

#[async_trait]
impl<T: Adapter + ?Sized> Completer for T {
    async fn complete_simple(
        &self,
        ctx: &RequestContext,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<String> {
        let req = Request {
            run_id: uuid::Uuid::new_v4().to_string(),
            model: model.to_string(),
            max_tokens: 1024,
            system: Some(crate::schema::SystemPrompt::Text(system.to_string())),
            messages: vec![crate::schema::Message {
                role: crate::schema::Role::User,
                content: crate::schema::Content::Text(user.to_string()),
            }],
            tools: Vec::new(),
            metadata: Default::default(),
            headers: Default::default(),
            stream: false,
        };

        let response = self.complete(ctx, &req).await?;
        Ok(response.text())
    }
}
