//! Health scheduler: per-adapter failure/latency/probe bookkeeping, used
//! to order and filter candidates before the router dispatches to them.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use config::SchedulerConfig;
use serde::Serialize;

use crate::error::GatewayError;

/// Per-model probe facts the scheduler consults for admission.
#[derive(Debug, Clone, Default)]
pub struct ModelProbeFacts {
    pub checked_at: Option<Instant>,
    pub exists_known: bool,
    pub exists: bool,
    pub stream_known: bool,
    pub stream_ok: bool,
    pub tool_known: bool,
    pub tool_ok: bool,
    pub last_error: Option<String>,
    pub last_latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct AdapterState {
    pub successes: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    pub last_latency_ms: Option<u64>,
    pub last_error: Option<String>,
    pub last_success: Option<Instant>,
    pub last_failure: Option<Instant>,
    pub cooldown_until: Option<Instant>,
    pub models: HashMap<String, ModelProbeFacts>,
}

impl AdapterState {
    fn success_rate(&self) -> f64 {
        let total = self.successes + self.failures;
        if total == 0 { 0.5 } else { self.successes as f64 / total as f64 }
    }

    fn in_cooldown(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }
}

/// A candidate adapter as returned by [`Scheduler::order`], carrying
/// enough to explain why it was or wasn't admitted.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub allowed: bool,
    pub score: f64,
}

/// Serializable point-in-time view of a single model's probe facts, for
/// the admin introspection endpoint. Drops the raw `Instant`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelProbeSnapshot {
    pub model: String,
    pub exists_known: bool,
    pub exists: bool,
    pub stream_known: bool,
    pub stream_ok: bool,
    pub tool_known: bool,
    pub tool_ok: bool,
    pub last_latency_ms: Option<u64>,
    pub last_error: Option<String>,
}

/// Serializable point-in-time view of [`AdapterState`], for the admin
/// introspection endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AdapterSnapshot {
    pub name: String,
    pub successes: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    pub in_cooldown: bool,
    pub last_latency_ms: Option<u64>,
    pub last_error: Option<String>,
    pub models: Vec<ModelProbeSnapshot>,
}

pub struct Scheduler {
    config: SchedulerConfig,
    state: RwLock<HashMap<String, AdapterState>>,
    /// Registration order, used as the stable secondary sort key.
    order: RwLock<Vec<String>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
        }
    }

    pub fn register(&self, name: &str) {
        let mut state = self.state.write().unwrap();
        state.entry(name.to_string()).or_default();
        let mut order = self.order.write().unwrap();
        if !order.iter().any(|n| n == name) {
            order.push(name.to_string());
        }
    }

    pub fn observe_success(&self, name: &str, latency_ms: u64) {
        let mut state = self.state.write().unwrap();
        let entry = state.entry(name.to_string()).or_default();
        entry.successes += 1;
        entry.consecutive_failures = 0;
        entry.last_latency_ms = Some(latency_ms);
        entry.last_success = Some(Instant::now());
        log::debug!(adapter = name, latency_ms; "adapter call succeeded");
    }

    pub fn observe_failure(&self, name: &str, model: &str, error_text: &str) {
        let mut state = self.state.write().unwrap();
        let entry = state.entry(name.to_string()).or_default();
        entry.failures += 1;
        entry.consecutive_failures += 1;
        entry.last_error = Some(error_text.to_string());
        entry.last_failure = Some(Instant::now());

        if entry.consecutive_failures >= self.config.failure_threshold {
            entry.cooldown_until = Some(Instant::now() + self.config.cooldown);
            log::info!(adapter = name, consecutive_failures = entry.consecutive_failures; "adapter entered cooldown");
        }

        if GatewayError::looks_like_model_not_found(error_text) {
            let facts = entry.models.entry(model.to_string()).or_default();
            facts.exists_known = true;
            facts.exists = false;
            facts.checked_at = Some(Instant::now());
        }
    }

    pub fn observe_probe(&self, name: &str, model: &str, facts: ModelProbeFacts) {
        let mut state = self.state.write().unwrap();
        let entry = state.entry(name.to_string()).or_default();
        entry.models.insert(model.to_string(), facts);
    }

    /// Order candidates for `model`, filtering by admission rules.
    ///
    /// Returns the allowed prefix sorted by (score desc, registration
    /// order asc, name asc), unless strict gating is on and nothing is
    /// allowed, in which case the result is empty either way.
    pub fn order(&self, names: &[String], model: &str, want_stream: bool, want_tools: bool) -> Vec<Candidate> {
        let now = Instant::now();
        let state = self.state.read().unwrap();

        let mut candidates: Vec<(usize, Candidate)> = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let default_state = AdapterState::default();
                let entry = state.get(name).unwrap_or(&default_state);
                let model_facts = entry.models.get(model);

                let allowed = self.is_allowed(entry, model_facts, now, want_stream, want_tools);
                let score = self.score(entry, model_facts, now, want_stream, want_tools);

                (index, Candidate { name: name.clone(), allowed, score })
            })
            .collect();

        // Original arrival index is the explicit tiebreak; name only
        // decides ties that somehow share an index (never happens for a
        // well-formed `names` slice, but keeps the comparator total).
        candidates.sort_by(|(ai, a), (bi, b)| {
            b.allowed
                .cmp(&a.allowed)
                .then(b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
                .then(ai.cmp(bi))
                .then(a.name.cmp(&b.name))
        });

        let candidates: Vec<Candidate> = candidates.into_iter().map(|(_, c)| c).collect();

        let allowed_count = candidates.iter().take_while(|c| c.allowed).count();

        if allowed_count == 0 {
            if self.config.strict_probe_gate {
                return Vec::new();
            }
            return candidates;
        }

        candidates.into_iter().take(allowed_count).collect()
    }

    /// Adapter names in registration order, for admin introspection.
    pub fn registered_names(&self) -> Vec<String> {
        self.order.read().unwrap().clone()
    }

    /// Health snapshot of every registered adapter, in registration
    /// order, for the admin introspection endpoint.
    pub fn snapshot(&self) -> Vec<AdapterSnapshot> {
        let now = Instant::now();
        let order = self.order.read().unwrap();
        let state = self.state.read().unwrap();

        order
            .iter()
            .map(|name| {
                let default_state = AdapterState::default();
                let entry = state.get(name).unwrap_or(&default_state);

                let mut models: Vec<ModelProbeSnapshot> = entry
                    .models
                    .iter()
                    .map(|(model, facts)| ModelProbeSnapshot {
                        model: model.clone(),
                        exists_known: facts.exists_known,
                        exists: facts.exists,
                        stream_known: facts.stream_known,
                        stream_ok: facts.stream_ok,
                        tool_known: facts.tool_known,
                        tool_ok: facts.tool_ok,
                        last_latency_ms: facts.last_latency_ms,
                        last_error: facts.last_error.clone(),
                    })
                    .collect();
                models.sort_by(|a, b| a.model.cmp(&b.model));

                AdapterSnapshot {
                    name: name.clone(),
                    successes: entry.successes,
                    failures: entry.failures,
                    consecutive_failures: entry.consecutive_failures,
                    in_cooldown: entry.in_cooldown(now),
                    last_latency_ms: entry.last_latency_ms,
                    last_error: entry.last_error.clone(),
                    models,
                }
            })
            .collect()
    }

    fn is_allowed(
        &self,
        entry: &AdapterState,
        model_facts: Option<&ModelProbeFacts>,
        now: Instant,
        want_stream: bool,
        want_tools: bool,
    ) -> bool {
        if entry.in_cooldown(now) {
            return false;
        }

        if let Some(facts) = model_facts {
            if facts.exists_known && !facts.exists {
                return false;
            }
            if want_stream && self.config.require_stream_probe && facts.stream_known && !facts.stream_ok {
                return false;
            }
            if want_tools && self.config.require_tool_probe && facts.tool_known && !facts.tool_ok {
                return false;
            }
        }

        true
    }

    fn score(&self, entry: &AdapterState, model_facts: Option<&ModelProbeFacts>, now: Instant, want_stream: bool, want_tools: bool) -> f64 {
        if entry.in_cooldown(now) {
            return -1000.0;
        }

        let mut score = 100.0;
        score -= 15.0 * entry.consecutive_failures as f64;
        score -= (entry.last_latency_ms.unwrap_or(0) as f64 / 120.0).min(30.0);
        score += (entry.success_rate() - 0.5) * 40.0;

        if let Some(facts) = model_facts {
            if facts.exists_known && !facts.exists {
                score -= 500.0;
            }
            if want_stream && facts.stream_known {
                score += if facts.stream_ok { 3.0 } else { -20.0 };
            }
            if want_tools && facts.tool_known {
                score += if facts.tool_ok { 3.0 } else { -20.0 };
            }
        }

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_entered_after_threshold_failures() {
        let scheduler = Scheduler::new(SchedulerConfig {
            failure_threshold: 2,
            cooldown: Duration::from_secs(30),
            ..SchedulerConfig::default()
        });
        scheduler.register("a1");

        scheduler.observe_failure("a1", "m1", "boom");
        let ordered = scheduler.order(&["a1".to_string()], "m1", false, false);
        assert!(ordered[0].allowed, "one failure must not trip cooldown");

        scheduler.observe_failure("a1", "m1", "boom again");
        let ordered = scheduler.order(&["a1".to_string()], "m1", false, false);
        assert!(!ordered[0].allowed, "second consecutive failure must trip cooldown");
    }

    #[test]
    fn model_not_found_text_marks_model_unavailable() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        scheduler.register("a1");
        scheduler.observe_failure("a1", "ghost-model", "Error: model not found");

        let ordered = scheduler.order(&["a1".to_string()], "ghost-model", false, false);
        assert!(!ordered[0].allowed);
    }

    #[test]
    fn tool_probe_gating_excludes_adapter_without_tool_support() {
        let scheduler = Scheduler::new(SchedulerConfig {
            require_tool_probe: true,
            ..SchedulerConfig::default()
        });
        scheduler.register("a1");
        scheduler.register("a2");

        scheduler.observe_probe(
            "a1",
            "m1",
            ModelProbeFacts {
                tool_known: true,
                tool_ok: false,
                ..Default::default()
            },
        );
        scheduler.observe_probe(
            "a2",
            "m1",
            ModelProbeFacts {
                tool_known: true,
                tool_ok: true,
                ..Default::default()
            },
        );

        let ordered = scheduler.order(&["a1".to_string(), "a2".to_string()], "m1", false, true);
        let names: Vec<&str> = ordered.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a2"]);
    }

    #[test]
    fn strict_gate_returns_empty_when_nothing_allowed() {
        let scheduler = Scheduler::new(SchedulerConfig {
            failure_threshold: 1,
            strict_probe_gate: true,
            ..SchedulerConfig::default()
        });
        scheduler.register("a1");
        scheduler.observe_failure("a1", "m1", "boom");

        let ordered = scheduler.order(&["a1".to_string()], "m1", false, false);
        assert!(ordered.is_empty());
    }
}
