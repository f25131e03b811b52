//! Background probe runner: periodically exercises every registered
//! adapter/model pair and feeds what it learns to the [`Scheduler`] and,
//! via the intelligence quiz, to the [`Election`].

pub mod quiz;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use config::ProbeConfig;
use tokio::time::timeout;

use crate::adapter::Adapter;
use crate::election::Election;
use crate::request_context::RequestContext;
use crate::schema::{Content, Message, Request, Role, ToolDefinition};
use crate::scheduler::{ModelProbeFacts, Scheduler};

const TOOL_SMOKE_PROMPT: &str = "Call the get_weather tool for San Francisco.";

fn weather_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_weather".to_string(),
        description: "Get the current weather for a named location.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": { "location": { "type": "string" } },
            "required": ["location"],
        }),
    }
}

#[derive(Debug, Default)]
pub struct ProbeStats {
    pub runs: AtomicU64,
    pub checks: AtomicU64,
    pub errors: AtomicU64,
    pub last_run_ms: AtomicU64,
}

pub struct ProbeRunner {
    config: RwLock<ProbeConfig>,
    adapters: Vec<(String, Arc<dyn Adapter>)>,
    scheduler: Arc<Scheduler>,
    election: Arc<Election>,
    stats: ProbeStats,
}

impl ProbeRunner {
    pub fn new(config: ProbeConfig, adapters: Vec<(String, Arc<dyn Adapter>)>, scheduler: Arc<Scheduler>, election: Arc<Election>) -> Self {
        Self {
            config: RwLock::new(config),
            adapters,
            scheduler,
            election,
            stats: ProbeStats::default(),
        }
    }

    pub fn patch_config(&self, patch: impl FnOnce(&mut ProbeConfig)) {
        patch(&mut self.config.write().unwrap());
    }

    pub fn stats(&self) -> (u64, u64, u64, u64) {
        (
            self.stats.runs.load(Ordering::Relaxed),
            self.stats.checks.load(Ordering::Relaxed),
            self.stats.errors.load(Ordering::Relaxed),
            self.stats.last_run_ms.load(Ordering::Relaxed),
        )
    }

    fn models_for(&self, adapter: &dyn Adapter, configured: &[String]) -> Vec<String> {
        if !configured.is_empty() {
            return configured.to_vec();
        }
        adapter.model_hint().unwrap_or_default()
    }

    /// Run every configured probe once, synchronously. Returns once all
    /// adapters have been exercised.
    pub async fn run_once(&self) {
        let config = self.config.read().unwrap().clone();
        if !config.enabled {
            return;
        }

        let start = Instant::now();
        let mut scores = Vec::new();

        for (name, adapter) in &self.adapters {
            let models = self.models_for(adapter.as_ref(), &config.models);

            for model in &models {
                self.probe_model(name, adapter.as_ref(), model, &config).await;
            }

            if config.intelligence_quiz
                && let Some(model) = models.first()
            {
                let ctx = RequestContext::with_timeout(config.timeout);
                match quiz::run(adapter.as_ref(), &ctx, model).await {
                    Ok(score) => scores.push((name.clone(), score as f64)),
                    Err(_) => {
                        self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    }
                };
            }
        }

        if !scores.is_empty() {
            self.election.elect(scores);
        }

        self.stats.runs.fetch_add(1, Ordering::Relaxed);
        self.stats.last_run_ms.store(start.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    async fn probe_model(&self, name: &str, adapter: &dyn Adapter, model: &str, config: &ProbeConfig) {
        self.stats.checks.fetch_add(1, Ordering::Relaxed);
        let ctx = RequestContext::with_timeout(config.timeout);

        let mut facts = ModelProbeFacts {
            checked_at: Some(Instant::now()),
            ..Default::default()
        };

        let liveness_req = simple_request(model, "ping", 16, Vec::new());
        let liveness_start = Instant::now();

        match timeout(config.timeout, adapter.complete(&ctx, &liveness_req)).await {
            Ok(Ok(_)) => {
                facts.exists_known = true;
                facts.exists = true;
                facts.last_latency_ms = Some(liveness_start.elapsed().as_millis() as u64);
            }
            Ok(Err(err)) => {
                facts.exists_known = true;
                facts.exists = false;
                facts.last_error = Some(err.message());
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                facts.exists_known = true;
                facts.exists = false;
                facts.last_error = Some("probe timed out".to_string());
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
            }
        }

        if facts.exists && config.stream_smoke && adapter.supports_streaming() {
            facts.stream_known = true;
            facts.stream_ok = self.probe_stream(adapter, model, config).await;
        }

        if facts.exists && config.tool_smoke {
            facts.tool_known = true;
            facts.tool_ok = self.probe_tool(adapter, model, config).await;
        }

        self.scheduler.observe_probe(name, model, facts);
    }

    async fn probe_stream(&self, adapter: &dyn Adapter, model: &str, config: &ProbeConfig) -> bool {
        use futures::StreamExt;

        let ctx = RequestContext::with_timeout(config.timeout);
        let req = simple_request(model, "ping", 16, Vec::new());

        let Ok(mut stream) = adapter.stream(&ctx, &req).await else {
            return false;
        };

        matches!(timeout(config.timeout, stream.next()).await, Ok(Some(Ok(_))))
    }

    async fn probe_tool(&self, adapter: &dyn Adapter, model: &str, config: &ProbeConfig) -> bool {
        let ctx = RequestContext::with_timeout(config.timeout);
        let req = simple_request(model, TOOL_SMOKE_PROMPT, 128, vec![weather_tool()]);

        match timeout(config.timeout, adapter.complete(&ctx, &req)).await {
            Ok(Ok(response)) => response.stop_reason == crate::schema::StopReason::ToolUse || response.has_tool_use(),
            _ => false,
        }
    }

    /// Run `run_once` on `config.interval`, forever. Intended to be
    /// spawned as a background task.
    pub async fn run_forever(self: Arc<Self>) {
        loop {
            let interval = self.config.read().unwrap().interval;
            self.run_once().await;
            tokio::time::sleep(interval).await;
        }
    }
}

fn simple_request(model: &str, text: &str, max_tokens: u32, tools: Vec<ToolDefinition>) -> Request {
    Request {
        run_id: uuid::Uuid::new_v4().to_string(),
        model: model.to_string(),
        max_tokens,
        system: None,
        messages: vec![Message {
            role: Role::User,
            content: Content::Text(text.to_string()),
        }],
        tools,
        metadata: HashMap::new(),
        headers: HashMap::new(),
        stream: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::canonical::CanonicalAdapter;
    use crate::schema::{Response, ResponseBlock, StopReason, Usage};
    use config::ElectionConfig;

    fn ok_response(text: &str) -> Response {
        Response {
            model: "m".into(),
            blocks: vec![ResponseBlock::Text { text: text.into() }],
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
            trace: Default::default(),
        }
    }

    #[tokio::test]
    async fn run_once_populates_scheduler_and_election() {
        let adapter: Arc<dyn Adapter> = Arc::new(CanonicalAdapter::fixed("solo", ok_response("1591")));
        let scheduler = Arc::new(Scheduler::new(config::SchedulerConfig::default()));
        scheduler.register("solo");
        let election = Arc::new(Election::new(ElectionConfig::default()));

        let mut probe_config = ProbeConfig::default();
        probe_config.models = vec!["m".to_string()];
        probe_config.timeout = Duration::from_secs(5);

        let runner = ProbeRunner::new(probe_config, vec![("solo".to_string(), adapter)], scheduler.clone(), election.clone());
        runner.run_once().await;

        let (runs, checks, _, _) = runner.stats();
        assert_eq!(runs, 1);
        assert_eq!(checks, 1);
        assert!(election.current().is_some());
    }
}
