//! Scheduler/worker election driven by intelligence quiz scores.

use std::sync::RwLock;

use config::ElectionConfig;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionReason {
    SingleAdapter,
    HighestIntelligenceScore,
    CloseScoresTiebreak,
}

#[derive(Debug, Clone, Serialize)]
pub struct ElectionResult {
    pub scheduler: String,
    pub workers: Vec<String>,
    pub reason: ElectionReason,
}

pub type ElectionCallback = Box<dyn Fn(&ElectionResult) + Send + Sync>;

pub struct Election {
    config: ElectionConfig,
    current: RwLock<Option<ElectionResult>>,
    callback: RwLock<Option<ElectionCallback>>,
}

impl Election {
    pub fn new(config: ElectionConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
            callback: RwLock::new(None),
        }
    }

    pub fn on_result(&self, callback: ElectionCallback) {
        *self.callback.write().unwrap() = Some(callback);
    }

    pub fn current(&self) -> Option<ElectionResult> {
        self.current.read().unwrap().clone()
    }

    /// Run an election over `scores`, named adapter → intelligence
    /// score, highest score wins the scheduler role. Fires the
    /// registered callback exactly once with the produced result.
    pub fn elect(&self, mut scores: Vec<(String, f64)>) -> Option<ElectionResult> {
        if scores.is_empty() {
            return None;
        }

        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));

        let (scheduler, top_score) = scores[0].clone();
        let workers: Vec<String> = scores[1..].iter().map(|(name, _)| name.clone()).collect();

        let reason = if scores.len() == 1 {
            ElectionReason::SingleAdapter
        } else {
            let gap = top_score - scores[1].1;
            if gap < self.config.min_score_difference {
                ElectionReason::CloseScoresTiebreak
            } else {
                ElectionReason::HighestIntelligenceScore
            }
        };

        let result = ElectionResult { scheduler, workers, reason };

        *self.current.write().unwrap() = Some(result.clone());
        if let Some(callback) = self.callback.read().unwrap().as_ref() {
            callback(&result);
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_adapter_elects_itself() {
        let election = Election::new(ElectionConfig::default());
        let result = election.elect(vec![("solo".to_string(), 42.0)]).unwrap();
        assert_eq!(result.scheduler, "solo");
        assert!(result.workers.is_empty());
        assert_eq!(result.reason, ElectionReason::SingleAdapter);
    }

    #[test]
    fn clear_gap_produces_highest_intelligence_score() {
        let election = Election::new(ElectionConfig::default());
        let result = election
            .elect(vec![("a".to_string(), 90.0), ("b".to_string(), 50.0), ("c".to_string(), 40.0)])
            .unwrap();
        assert_eq!(result.scheduler, "a");
        assert_eq!(result.workers, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(result.reason, ElectionReason::HighestIntelligenceScore);
    }

    #[test]
    fn close_scores_flagged_as_tiebreak() {
        let election = Election::new(ElectionConfig {
            min_score_difference: 5.0,
            ..ElectionConfig::default()
        });
        let result = election.elect(vec![("a".to_string(), 90.0), ("b".to_string(), 87.0)]).unwrap();
        assert_eq!(result.reason, ElectionReason::CloseScoresTiebreak);
    }

    #[test]
    fn callback_fires_once_per_election() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let election = Election::new(ElectionConfig::default());
        let calls_clone = calls.clone();
        election.on_result(Box::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        election.elect(vec![("a".to_string(), 1.0)]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        election.elect(vec![("a".to_string(), 1.0), ("b".to_string(), 2.0)]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
