//! Central request orchestrator: route resolution, parallel candidate
//! racing, judge-based selection, the reflection loop, and streaming.

pub mod reflection;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use config::{JudgeStrategy, RouterConfig, RoutesConfig};
use dashmap::DashMap;
use telemetry::attributes::{GEN_AI_OPERATION_NAME, GEN_AI_PROVIDER_NAME, GEN_AI_REQUEST_MODEL};
use telemetry::metrics::Recorder;

use crate::adapter::{Adapter, EventStream};
use crate::dispatcher::Dispatcher;
use crate::election::Election;
use crate::error::{GatewayError, Result};
use crate::hooks::{HookPoint, HooksRegistry};
use crate::judge::{Candidate as JudgeCandidate, HeuristicJudge, Judge, LlmJudge};
use crate::request_context::RequestContext;
use crate::scheduler::Scheduler;
use crate::schema::{Request, Response, SelectedBy, Trace};
use crate::stream::synthesize_stream;

/// Metadata keys the router reads as per-request overrides.
mod meta_keys {
    pub const ADAPTER_ROUTE: &str = "routing_adapter_route";
    pub const RETRIES: &str = "routing_retries";
    pub const REFLECTION_PASSES: &str = "reflection_passes";
    pub const TIMEOUT_MS: &str = "routing_timeout_ms";
    pub const PARALLEL_CANDIDATES: &str = "parallel_candidates";
    pub const ENABLE_JUDGE: &str = "enable_response_judge";
    pub const STRICT_PASSTHROUGH: &str = "strict_stream_passthrough";
    pub const STRICT_PASSTHROUGH_SOFT: &str = "strict_stream_passthrough_soft";
}

pub struct Router {
    adapters: DashMap<String, Arc<dyn Adapter>>,
    registration_order: RwLock<Vec<String>>,
    routes: RoutesConfig,
    config: RouterConfig,
    scheduler: Arc<Scheduler>,
    election: Arc<Election>,
    dispatcher: Arc<Dispatcher>,
    hooks: HooksRegistry,
}

struct RunOutcome {
    adapter: String,
    order: usize,
    response: Response,
    latency_ms: u64,
}

impl Router {
    pub fn new(routes: RoutesConfig, config: RouterConfig, scheduler: Arc<Scheduler>, election: Arc<Election>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            adapters: DashMap::new(),
            registration_order: RwLock::new(Vec::new()),
            routes,
            config,
            scheduler,
            election,
            dispatcher,
            hooks: HooksRegistry::new(),
        }
    }

    /// Register a lifecycle hook. Exposed so operators can wire
    /// observers or short-circuiting handlers without changing
    /// `Router::new`'s constructor shape.
    pub fn register_hook(&self, point: HookPoint, hook: Arc<dyn crate::hooks::Hook>) {
        self.hooks.register(point, hook);
    }

    pub fn register_adapter(&self, adapter: Arc<dyn Adapter>) {
        let name = adapter.name().to_string();
        self.scheduler.register(&name);
        self.adapters.insert(name.clone(), adapter);
        let mut order = self.registration_order.write().unwrap();
        if !order.iter().any(|n| n == &name) {
            order.push(name);
        }
    }

    fn adapter(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(name).map(|entry| entry.value().clone())
    }

    /// Public accessor for wiring an external consumer (the probe
    /// runner, admin introspection) to an already-registered adapter.
    pub fn adapter_handle(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapter(name)
    }

    /// Resolve the ordered list of adapter names to try for `req`,
    /// following the route-resolution precedence.
    fn resolve_route(&self, req: &Request) -> Vec<String> {
        if let Some(name) = req.metadata.get(meta_keys::ADAPTER_ROUTE).and_then(|v| v.as_str()) {
            return vec![name.to_string()];
        }

        let election = self.election.current();
        let healthy = match &election {
            Some(election) => self
                .scheduler
                .order(std::slice::from_ref(&election.scheduler), &req.model, false, false)
                .first()
                .map(|c| c.allowed)
                .unwrap_or(false),
            None => true,
        };

        if let Some(route) = self.dispatcher.route(req, election.as_ref(), healthy) {
            return route;
        }

        if let Some(route) = self.routes.routes.get(&req.model) {
            return route.clone();
        }

        let mut best: Option<(usize, &Vec<String>)> = None;
        for (pattern, route) in &self.routes.routes {
            if RoutesConfig::is_glob(pattern) && glob_match(pattern, &req.model) {
                let specificity = RoutesConfig::specificity(pattern);
                if best.as_ref().is_none_or(|(best_specificity, _)| specificity > *best_specificity) {
                    best = Some((specificity, route));
                }
            }
        }
        if let Some((_, route)) = best {
            return route.clone();
        }

        if let Some(route) = self.routes.routes.get("*") {
            return route.clone();
        }

        if !self.routes.default.is_empty() {
            return self.routes.default.clone();
        }

        self.registration_order.read().unwrap().clone()
    }

    fn overridden_config(&self, req: &Request) -> (u32, u32, Duration, u32, bool) {
        let retries = req
            .metadata
            .get(meta_keys::RETRIES)
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or(self.config.retries);

        let reflection_passes = req
            .metadata
            .get(meta_keys::REFLECTION_PASSES)
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or(self.config.reflection_passes);

        let timeout = req
            .metadata
            .get(meta_keys::TIMEOUT_MS)
            .and_then(|v| v.as_u64())
            .map(Duration::from_millis)
            .unwrap_or(self.config.timeout);

        let parallel = req
            .metadata
            .get(meta_keys::PARALLEL_CANDIDATES)
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or(self.config.parallel_candidates)
            .max(1);

        let enable_judge = req
            .metadata
            .get(meta_keys::ENABLE_JUDGE)
            .and_then(|v| v.as_bool())
            .unwrap_or(self.config.enable_response_judge);

        (retries, reflection_passes, timeout, parallel, enable_judge)
    }

    async fn run_candidate(&self, ctx: &RequestContext, req: &Request, name: &str, order: usize, retries: u32) -> std::result::Result<RunOutcome, GatewayError> {
        let Some(adapter) = self.adapter(name) else {
            return Err(GatewayError::NoUpstreamAvailable(format!("adapter '{name}' is not registered")));
        };

        let mut recorder = Recorder::new();
        recorder.push_attribute(GEN_AI_OPERATION_NAME, "chat");
        recorder.push_attribute(GEN_AI_PROVIDER_NAME, name.to_string());
        recorder.push_attribute(GEN_AI_REQUEST_MODEL, req.model.clone());

        let mut last_error = None;
        for _ in 0..=retries {
            let start = Instant::now();
            match adapter.complete(ctx, req).await {
                Ok(response) => {
                    let latency_ms = start.elapsed().as_millis() as u64;
                    self.scheduler.observe_success(name, latency_ms);
                    recorder.record_tokens(response.usage.input_tokens as u64, response.usage.output_tokens as u64);
                    recorder.set_response_model(response.model.clone());
                    return Ok(RunOutcome {
                        adapter: name.to_string(),
                        order,
                        response,
                        latency_ms,
                    });
                }
                Err(err) => {
                    self.scheduler.observe_failure(name, &req.model, &err.message());
                    last_error = Some(err);
                }
            }
        }

        let err = last_error.unwrap_or(GatewayError::NoUpstreamAvailable(format!("adapter '{name}' failed with no error recorded")));
        recorder.set_error_type(error_type_label(&err));
        Err(err)
    }

    /// Non-streaming completion, including reflection if configured.
    pub async fn complete(&self, ctx: &RequestContext, req: &Request) -> Result<Response> {
        self.hooks
            .fire(HookPoint::BeforeRoute, ctx, serde_json::json!({"model": req.model, "run_id": req.run_id}))
            .await?;

        let route = self.resolve_route(req);
        let candidates = self.scheduler.order(&route, &req.model, false, !req.tools.is_empty());

        if candidates.is_empty() {
            return Err(GatewayError::NoUpstreamAvailable(format!("no upstream available for model '{}'", req.model)));
        }

        let (retries, reflection_passes, timeout, parallel, enable_judge) = self.overridden_config(req);
        let ctx = ctx.child(Some(timeout));

        let mut outcomes = Vec::new();
        let mut last_error = None;

        if parallel <= 1 {
            for (order, candidate) in candidates.iter().enumerate() {
                match self.run_candidate(&ctx, req, &candidate.name, order, retries).await {
                    Ok(outcome) => {
                        outcomes.push(outcome);
                        break;
                    }
                    Err(err) => last_error = Some(err),
                }
            }
        } else {
            let selected: Vec<_> = candidates.iter().take(parallel as usize).enumerate().collect();
            let calls = selected.into_iter().map(|(order, candidate)| {
                let ctx = ctx.clone();
                async move { self.run_candidate(&ctx, req, &candidate.name, order, retries).await }
            });

            let results = futures::future::join_all(calls).await;
            for result in results {
                match result {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(err) => last_error = Some(err),
                }
            }
        }

        if outcomes.is_empty() {
            return Err(last_error.unwrap_or(GatewayError::NoUpstreamAvailable("every candidate failed".to_string())));
        }

        let candidate_count = outcomes.len();
        let winning_adapter = outcomes.iter().min_by_key(|o| o.order).map(|o| o.adapter.clone()).unwrap_or_default();
        self.hooks
            .fire(HookPoint::AfterAdapterCall, &ctx, serde_json::json!({"adapter": winning_adapter, "candidate_count": candidate_count}))
            .await?;

        let (mut response, selected_by, judge_enabled) = self.select(&ctx, req, outcomes, enable_judge).await;

        response.trace = Trace {
            provider: response.trace.provider.clone(),
            model: req.model.clone(),
            fallback_used: response.trace.fallback_used,
            reflection_passes: 0,
            selected_by,
            candidate_count,
            judge_enabled,
        };

        if reflection_passes > 0 {
            reflection::run(self, &ctx, req, &mut response, reflection_passes).await;
        }

        self.hooks
            .fire(HookPoint::BeforeResponse, &ctx, serde_json::json!({"provider": response.trace.provider, "stop_reason": response.stop_reason}))
            .await?;

        Ok(response)
    }

    async fn select(&self, ctx: &RequestContext, req: &Request, outcomes: Vec<RunOutcome>, enable_judge: bool) -> (Response, SelectedBy, bool) {
        if outcomes.len() == 1 {
            let outcome = outcomes.into_iter().next().unwrap();
            let mut response = outcome.response;
            response.trace.provider = outcome.adapter;
            response.trace.fallback_used = outcome.order > 0;
            return (response, SelectedBy::Single, false);
        }

        if enable_judge {
            let judge_candidates: Vec<JudgeCandidate<'_>> = outcomes
                .iter()
                .map(|o| JudgeCandidate {
                    adapter: &o.adapter,
                    response: &o.response,
                    latency_ms: o.latency_ms,
                })
                .collect();

            let judge: Box<dyn Judge> = match self.config.judge.strategy {
                JudgeStrategy::Heuristic => Box::new(HeuristicJudge),
                JudgeStrategy::Llm => match (&self.config.judge.adapter, &self.config.judge.model) {
                    (Some(adapter_name), Some(model)) => match self.adapter(adapter_name) {
                        Some(adapter) => Box::new(LlmJudgeOwned { adapter, model: model.clone() }),
                        None => Box::new(HeuristicJudge),
                    },
                    _ => Box::new(HeuristicJudge),
                },
            };

            if let Ok(index) = judge.judge(ctx, &judge_candidates, !req.tools.is_empty()).await
                && index < outcomes.len()
            {
                let outcome = outcomes.into_iter().nth(index).unwrap();
                let mut response = outcome.response;
                response.trace.provider = outcome.adapter;
                response.trace.fallback_used = outcome.order > 0;
                return (response, SelectedBy::Judge, true);
            }
        }

        let mut outcomes = outcomes;
        outcomes.sort_by(|a, b| a.order.cmp(&b.order).then(a.latency_ms.cmp(&b.latency_ms)));
        let outcome = outcomes.into_iter().next().unwrap();
        let mut response = outcome.response;
        response.trace.provider = outcome.adapter;
        response.trace.fallback_used = outcome.order > 0;
        (response, SelectedBy::Priority, enable_judge)
    }

    /// Streaming completion: relays the first committed adapter's
    /// events, falling over to the next candidate on a pre-commit
    /// error.
    pub async fn stream(&self, ctx: &RequestContext, req: &Request) -> Result<EventStream> {
        self.hooks
            .fire(HookPoint::BeforeRoute, ctx, serde_json::json!({"model": req.model, "run_id": req.run_id}))
            .await?;

        let route = self.resolve_route(req);
        let candidates = self.scheduler.order(&route, &req.model, true, !req.tools.is_empty());

        if candidates.is_empty() {
            return Err(GatewayError::NoUpstreamAvailable(format!("no upstream available for model '{}'", req.model)));
        }

        let strict_passthrough = req.metadata.get(meta_keys::STRICT_PASSTHROUGH).and_then(|v| v.as_bool()).unwrap_or(false);
        let strict_soft = req
            .metadata
            .get(meta_keys::STRICT_PASSTHROUGH_SOFT)
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        let mut last_error = None;

        for candidate in &candidates {
            let Some(adapter) = self.adapter(&candidate.name) else { continue };

            if !adapter.supports_streaming() {
                match adapter.complete(ctx, req).await {
                    Ok(response) => {
                        self.scheduler.observe_success(&candidate.name, 0);
                        let events = synthesize_stream(&response);
                        return Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))));
                    }
                    Err(err) => {
                        self.scheduler.observe_failure(&candidate.name, &req.model, &err.message());
                        last_error = Some(err);
                        continue;
                    }
                }
            }

            match adapter.stream(ctx, req).await {
                Ok(stream) => {
                    self.scheduler.observe_success(&candidate.name, 0);
                    return Ok(stream);
                }
                Err(GatewayError::StrictPassthroughUnsupported { .. }) if strict_passthrough && strict_soft => {
                    match adapter.complete(ctx, req).await {
                        Ok(response) => {
                            let events = synthesize_stream(&response);
                            return Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))));
                        }
                        Err(err) => {
                            last_error = Some(err);
                            continue;
                        }
                    }
                }
                Err(err) => {
                    self.scheduler.observe_failure(&candidate.name, &req.model, &err.message());
                    last_error = Some(err);
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or(GatewayError::NoUpstreamAvailable("every streaming candidate failed".to_string())))
    }
}

/// Short label for the `error.type` attribute on the operation-duration
/// histogram, following the GenAI semantic convention's preference for a
/// low-cardinality discriminator over the full error message.
fn error_type_label(err: &GatewayError) -> &'static str {
    match err {
        GatewayError::ModelNotFound { .. } => "model_not_found",
        GatewayError::Transport { .. } => "transport_error",
        GatewayError::Protocol { .. } => "protocol_error",
        GatewayError::ToolNotImplemented { .. } => "tool_not_implemented",
        GatewayError::StrictPassthroughUnsupported { .. } => "strict_passthrough_unsupported",
        GatewayError::Cancelled => "cancelled",
        GatewayError::StreamingNotSupported { .. } => "streaming_not_supported",
        GatewayError::NoUpstreamAvailable(_) => "no_upstream_available",
        GatewayError::HookAborted { .. } => "hook_aborted",
        GatewayError::ScriptAdapter { .. } => "script_adapter_error",
        GatewayError::Configuration(_) => "configuration_error",
        GatewayError::Serialization(_) => "serialization_error",
        GatewayError::Io(_) => "io_error",
    }
}

/// `*`-wildcard match against a model name. Supports any number of `*`
/// segments (`gpt-4*`, `*-mini`, `openai/*-preview`).
fn glob_match(pattern: &str, text: &str) -> bool {
    fast_glob::glob_match(pattern, text)
}

struct LlmJudgeOwned {
    adapter: Arc<dyn Adapter>,
    model: String,
}

#[async_trait::async_trait]
impl Judge for LlmJudgeOwned {
    async fn judge(&self, ctx: &RequestContext, candidates: &[JudgeCandidate<'_>], tools_expected: bool) -> Result<usize> {
        let judge = LlmJudge::new(self.adapter.as_ref(), self.model.clone());
        judge.judge(ctx, candidates, tools_expected).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use config::{DispatcherConfig, ElectionConfig, SchedulerConfig};
    use serde_json::Value;

    use super::*;
    use crate::adapter::canonical::CanonicalAdapter;
    use crate::dispatcher::Dispatcher;
    use crate::election::Election;
    use crate::hooks::Hook;
    use crate::schema::{Content, Message, ResponseBlock, Role, StopReason, Usage};

    fn text_response(text: &str) -> Response {
        Response {
            model: "m".into(),
            blocks: vec![ResponseBlock::Text { text: text.into() }],
            stop_reason: StopReason::EndTurn,
            usage: Usage {
                input_tokens: 1,
                output_tokens: 2,
            },
            trace: Default::default(),
        }
    }

    fn request(model: &str) -> Request {
        Request {
            run_id: "r1".into(),
            model: model.into(),
            max_tokens: 64,
            system: None,
            messages: vec![Message {
                role: Role::User,
                content: Content::Text("hi".into()),
            }],
            tools: Vec::new(),
            metadata: HashMap::new(),
            headers: HashMap::new(),
            stream: false,
        }
    }

    fn router_with(routes: RoutesConfig) -> Router {
        let scheduler = Arc::new(Scheduler::new(SchedulerConfig::default()));
        let election = Arc::new(Election::new(ElectionConfig { enabled: false, ..ElectionConfig::default() }));
        let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig { enabled: false, ..DispatcherConfig::default() }));
        Router::new(routes, RouterConfig::default(), scheduler, election, dispatcher)
    }

    struct RejectingHook;

    #[async_trait]
    impl Hook for RejectingHook {
        fn name(&self) -> &str {
            "rejecting"
        }
        fn priority(&self) -> i32 {
            0
        }
        async fn call(&self, _ctx: &RequestContext, _data: Value) -> Result<Option<Value>> {
            Err(GatewayError::Configuration("blocked by policy".to_string()))
        }
    }

    #[tokio::test]
    async fn before_route_hook_can_abort_the_request() {
        let router = router_with(RoutesConfig {
            default: vec!["a1".to_string()],
            ..RoutesConfig::default()
        });
        router.register_adapter(Arc::new(CanonicalAdapter::fixed("a1", text_response("hi"))));
        router.register_hook(HookPoint::BeforeRoute, Arc::new(RejectingHook));

        let err = router.complete(&RequestContext::default(), &request("m1")).await.unwrap_err();
        assert!(matches!(err, GatewayError::HookAborted { .. }));
    }

    #[tokio::test]
    async fn without_hooks_completion_succeeds_as_before() {
        let router = router_with(RoutesConfig {
            default: vec!["a1".to_string()],
            ..RoutesConfig::default()
        });
        router.register_adapter(Arc::new(CanonicalAdapter::fixed("a1", text_response("hi"))));

        let response = router.complete(&RequestContext::default(), &request("m1")).await.unwrap();
        assert_eq!(response.trace.provider, "a1");
    }

    #[test]
    fn glob_match_supports_wildcard_segments() {
        assert!(glob_match("gpt-4*", "gpt-4-turbo"));
        assert!(glob_match("*-mini", "gpt-4-mini"));
        assert!(!glob_match("gpt-4*", "claude-3"));
    }
}
