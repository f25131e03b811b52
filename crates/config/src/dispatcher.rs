use serde::Deserialize;

/// Complexity-based dispatch between the elected scheduler adapter and
/// the elected worker adapters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    pub enabled: bool,

    /// Append the scheduler adapter as a final fallback candidate when
    /// dispatching to workers.
    pub fallback_to_scheduler: bool,

    /// Message character count above which a request is classified
    /// complex regardless of keyword matches.
    pub long_message_threshold: usize,

    /// Presence of tool definitions always classifies a request complex.
    pub tools_are_complex: bool,

    /// Keywords that push a request toward the complex band (planning,
    /// multi-step reasoning, architecture).
    pub complex_keywords: Vec<String>,

    /// Keywords that push a request toward the simple band (lookups,
    /// short factual asks).
    pub simple_keywords: Vec<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fallback_to_scheduler: true,
            long_message_threshold: 600,
            tools_are_complex: true,
            complex_keywords: [
                "architecture",
                "refactor",
                "design",
                "plan",
                "step by step",
                "analyze",
                "compare",
                "debug",
                "investigate",
                "trade-off",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            simple_keywords: [
                "what is",
                "define",
                "translate",
                "summarize",
                "convert",
                "spell",
                "capital of",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}
