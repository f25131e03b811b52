use std::time::Duration;

use duration_str::deserialize_duration;
use serde::Deserialize;

/// Router orchestration defaults. Most fields are overridable per
/// request via metadata keys of the same name.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,

    pub retries: u32,

    pub reflection_passes: u32,

    /// Number of route candidates to race concurrently.
    pub parallel_candidates: u32,

    pub enable_response_judge: bool,

    pub judge: JudgeConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            retries: 1,
            reflection_passes: 0,
            parallel_candidates: 1,
            enable_response_judge: false,
            judge: JudgeConfig::default(),
        }
    }
}

/// Judge strategy for picking among multiple successful candidates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JudgeConfig {
    pub strategy: JudgeStrategy,

    /// Adapter name to send the judging prompt to, when `strategy` is
    /// `llm`.
    pub adapter: Option<String>,

    /// Model name to request on the judge adapter.
    pub model: Option<String>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            strategy: JudgeStrategy::Heuristic,
            adapter: None,
            model: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JudgeStrategy {
    #[default]
    Heuristic,
    Llm,
}
