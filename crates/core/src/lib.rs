//! Core runtime of the multi-upstream LLM gateway: canonical schema,
//! adapters, health scheduling, election, dispatch, routing and the
//! background probe runner. The `gateway` binary is a thin HTTP shim
//! over this crate.

pub mod adapter;
pub mod dispatcher;
pub mod election;
pub mod error;
pub mod hooks;
pub mod judge;
pub mod persistence;
pub mod probe;
pub mod request_context;
pub mod router;
pub mod scheduler;
pub mod schema;
pub mod stream;

pub use adapter::{Adapter, AdapterKind, AdapterSpec, Completer, EventStream};
pub use dispatcher::{Complexity, DispatchEvent, Dispatcher, DispatcherSnapshot};
pub use election::{Election, ElectionCallback, ElectionReason, ElectionResult};
pub use error::{GatewayError, Result};
pub use hooks::{Hook, HookPoint, HooksRegistry};
pub use judge::{Candidate as JudgeCandidate, HeuristicJudge, Judge, LlmJudge};
pub use persistence::{Backend, FileBackend};
pub use probe::ProbeRunner;
pub use request_context::RequestContext;
pub use router::Router;
pub use scheduler::{AdapterSnapshot, AdapterState, Candidate as SchedulerCandidate, ModelProbeFacts, ModelProbeSnapshot, Scheduler};
pub use schema::{
    Content, ContentBlock, Message, Request, Response, ResponseBlock, Role, SelectedBy, StopReason, SystemPrompt, ToolDefinition, Trace, Usage,
};
pub use stream::{StartedBlock, StreamEvent, synthesize_stream};

use std::sync::Arc;

use config::GatewayConfig;

/// Build every adapter named in `config.adapters` and register it with
/// a freshly constructed [`Router`]. Does not start the probe runner;
/// the caller decides whether and how to spawn it.
pub fn build_router(config: &GatewayConfig) -> (Router, Arc<Scheduler>, Arc<Election>, Arc<Dispatcher>) {
    let scheduler = Arc::new(Scheduler::new(config.scheduler.clone()));
    let election = Arc::new(Election::new(config.election.clone()));
    let dispatcher = Arc::new(Dispatcher::new(config.dispatcher.clone()));

    let router = Router::new(config.routes.clone(), config.router.clone(), scheduler.clone(), election.clone(), dispatcher.clone());

    for (name, adapter_config) in &config.adapters {
        router.register_adapter(build_adapter(name, adapter_config));
    }

    (router, scheduler, election, dispatcher)
}

fn build_adapter(name: &str, config: &config::AdapterConfig) -> Arc<dyn Adapter> {
    match config {
        config::AdapterConfig::OpenAi(c) => Arc::new(adapter::openai::OpenAiAdapter::new(name, c.clone())),
        config::AdapterConfig::Anthropic(c) => Arc::new(adapter::anthropic::AnthropicAdapter::new(name, c.clone())),
        config::AdapterConfig::Gemini(c) => Arc::new(adapter::gemini::GeminiAdapter::new(name, c.clone())),
        config::AdapterConfig::Canonical(c) => Arc::new(adapter::canonical::CanonicalAdapter::new(name, c.clone())),
        config::AdapterConfig::Script(c) => Arc::new(adapter::script::ScriptAdapter::new(name, c.clone())),
    }
}

/// Collect `(name, adapter)` pairs for every adapter registered on
/// `router`, for wiring a [`ProbeRunner`].
pub fn adapters_for_probing(config: &GatewayConfig, router: &Router) -> Vec<(String, Arc<dyn Adapter>)> {
    config.adapters.keys().filter_map(|name| router.adapter_handle(name).map(|a| (name.clone(), a))).collect()
}
