use std::time::Duration;

use duration_str::deserialize_duration;
use serde::Deserialize;

/// Background probe runner cadence and scope.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    pub enabled: bool,

    #[serde(deserialize_with = "deserialize_duration")]
    pub interval: Duration,

    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,

    /// Run a minimal streaming request against each adapter to populate
    /// `stream_ok`.
    pub stream_smoke: bool,

    /// Run a minimal tool-calling request against each adapter to
    /// populate `tool_ok`.
    pub tool_smoke: bool,

    /// Models to probe per adapter when the adapter itself declares no
    /// model hint.
    pub models: Vec<String>,

    /// Run the 5-question intelligence quiz and feed its scores to the
    /// election.
    pub intelligence_quiz: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(45),
            timeout: Duration::from_secs(8),
            stream_smoke: true,
            tool_smoke: false,
            models: Vec::new(),
            intelligence_quiz: true,
        }
    }
}
