//! Complexity-based dispatch between the elected scheduler adapter and
//! the elected worker adapters.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use config::DispatcherConfig;
use serde::Serialize;

use crate::election::ElectionResult;
use crate::schema::Request;

const EVENT_LOG_CAPACITY: usize = 100;

const PLANNING_KEYWORDS: &[&str] = &[
    "plan", "architect", "design", "analyze", "debug", "refactor", "review", "thinking", "reasoning", "step by step",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Complex,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchEvent {
    pub model: String,
    pub complexity: Complexity,
    pub route: Vec<String>,
}

#[derive(Debug, Default)]
pub struct DispatcherStats {
    pub complex_routed: AtomicU64,
    pub simple_routed: AtomicU64,
    pub fallback_count: AtomicU64,
}

/// Serializable point-in-time view of [`DispatcherStats`], for the admin
/// introspection endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherSnapshot {
    pub enabled: bool,
    pub complex_routed: u64,
    pub simple_routed: u64,
    pub fallback_count: u64,
    pub recent_events: Vec<DispatchEvent>,
}

pub struct Dispatcher {
    config: DispatcherConfig,
    round_robin: AtomicUsize,
    events: Mutex<VecDeque<DispatchEvent>>,
    pub stats: DispatcherStats,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            round_robin: AtomicUsize::new(0),
            events: Mutex::new(VecDeque::with_capacity(EVENT_LOG_CAPACITY)),
            stats: DispatcherStats::default(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn classify(&self, req: &Request) -> Complexity {
        if !req.tools.is_empty() && self.config.tools_are_complex {
            return Complexity::Complex;
        }

        let message_text = req.last_user_text().to_lowercase();
        let has_complex_keyword = self.config.complex_keywords.iter().any(|kw| message_text.contains(&kw.to_lowercase()));
        let has_simple_keyword = self.config.simple_keywords.iter().any(|kw| message_text.contains(&kw.to_lowercase()));

        let system_text = req.system_text().to_lowercase();
        let has_planning_keyword = PLANNING_KEYWORDS.iter().any(|kw| system_text.contains(kw));

        if has_complex_keyword || has_planning_keyword {
            return Complexity::Complex;
        }

        let is_long = req.total_message_chars() > self.config.long_message_threshold;
        if is_long && !has_simple_keyword {
            return Complexity::Complex;
        }

        Complexity::Simple
    }

    /// Route a request given the current election, or `None` if
    /// dispatch is disabled or no election has run yet (the router
    /// falls back to static route resolution in that case).
    pub fn route(&self, req: &Request, election: Option<&ElectionResult>, scheduler_healthy: bool) -> Option<Vec<String>> {
        if !self.config.enabled {
            return None;
        }
        let election = election?;

        let complexity = self.classify(req);
        let route = match complexity {
            Complexity::Complex => {
                self.stats.complex_routed.fetch_add(1, Ordering::Relaxed);
                self.route_complex(election, scheduler_healthy)
            }
            Complexity::Simple => {
                self.stats.simple_routed.fetch_add(1, Ordering::Relaxed);
                self.route_simple(election, scheduler_healthy)
            }
        };

        self.record(DispatchEvent {
            model: req.model.clone(),
            complexity,
            route: route.clone(),
        });

        Some(route)
    }

    fn route_complex(&self, election: &ElectionResult, scheduler_healthy: bool) -> Vec<String> {
        if scheduler_healthy {
            let mut route = vec![election.scheduler.clone()];
            route.extend(election.workers.iter().cloned());
            route
        } else if !election.workers.is_empty() {
            self.stats.fallback_count.fetch_add(1, Ordering::Relaxed);
            election.workers.clone()
        } else {
            self.stats.fallback_count.fetch_add(1, Ordering::Relaxed);
            vec![election.scheduler.clone()]
        }
    }

    fn route_simple(&self, election: &ElectionResult, _scheduler_healthy: bool) -> Vec<String> {
        if election.workers.is_empty() {
            return vec![election.scheduler.clone()];
        }

        let n = election.workers.len();
        let start = self.round_robin.fetch_add(1, Ordering::Relaxed) % n;

        let mut route: Vec<String> = election.workers[start..].iter().cloned().collect();
        route.extend(election.workers[..start].iter().cloned());

        if self.config.fallback_to_scheduler {
            route.push(election.scheduler.clone());
        }

        route
    }

    fn record(&self, event: DispatchEvent) {
        let mut events = self.events.lock().unwrap();
        if events.len() == EVENT_LOG_CAPACITY {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub fn recent_events(&self) -> Vec<DispatchEvent> {
        self.events.lock().unwrap().iter().cloned().collect()
    }

    pub fn snapshot(&self) -> DispatcherSnapshot {
        DispatcherSnapshot {
            enabled: self.config.enabled,
            complex_routed: self.stats.complex_routed.load(Ordering::Relaxed),
            simple_routed: self.stats.simple_routed.load(Ordering::Relaxed),
            fallback_count: self.stats.fallback_count.load(Ordering::Relaxed),
            recent_events: self.recent_events(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Content, Message, Role};

    fn request_with_text(text: &str) -> Request {
        Request {
            run_id: "r".into(),
            model: "m".into(),
            max_tokens: 10,
            system: None,
            messages: vec![Message {
                role: Role::User,
                content: Content::Text(text.to_string()),
            }],
            tools: Vec::new(),
            metadata: Default::default(),
            headers: Default::default(),
            stream: false,
        }
    }

    fn election() -> ElectionResult {
        ElectionResult {
            scheduler: "sched".into(),
            workers: vec!["w1".into(), "w2".into()],
            reason: crate::election::ElectionReason::HighestIntelligenceScore,
        }
    }

    #[test]
    fn long_message_is_complex() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default());
        let req = request_with_text(&"x".repeat(5000));
        assert_eq!(dispatcher.classify(&req), Complexity::Complex);
    }

    #[test]
    fn short_plain_message_is_simple() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default());
        let req = request_with_text("what is the capital of France?");
        assert_eq!(dispatcher.classify(&req), Complexity::Simple);
    }

    #[test]
    fn complex_route_puts_scheduler_first_when_healthy() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default());
        let req = request_with_text("please refactor this module");
        let route = dispatcher.route(&req, Some(&election()), true).unwrap();
        assert_eq!(route[0], "sched");
    }

    #[test]
    fn simple_route_round_robins_over_workers() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default());
        let req = request_with_text("what is the capital of France?");

        let first = dispatcher.route(&req, Some(&election()), true).unwrap();
        let second = dispatcher.route(&req, Some(&election()), true).unwrap();

        assert_ne!(first[0], second[0], "round robin should rotate the starting worker");
    }

    #[test]
    fn disabled_dispatcher_returns_none() {
        let dispatcher = Dispatcher::new(DispatcherConfig {
            enabled: false,
            ..DispatcherConfig::default()
        });
        let req = request_with_text("anything");
        assert!(dispatcher.route(&req, Some(&election()), true).is_none());
    }
}
