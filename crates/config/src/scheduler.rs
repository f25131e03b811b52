use std::time::Duration;

use duration_str::deserialize_duration;
use serde::Deserialize;

/// Health scheduler thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Consecutive failures before an adapter enters cooldown.
    pub failure_threshold: u32,

    /// How long an adapter stays in cooldown once entered.
    #[serde(deserialize_with = "deserialize_duration")]
    pub cooldown: Duration,

    /// Fail closed when no adapter survives admission filtering, instead
    /// of falling back to the full unfiltered candidate list.
    pub strict_probe_gate: bool,

    /// Reject an adapter for a streaming request if its stream probe is
    /// known and failed.
    pub require_stream_probe: bool,

    /// Reject an adapter for a tool-bearing request if its tool probe is
    /// known and failed.
    pub require_tool_probe: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(30),
            strict_probe_gate: false,
            require_stream_probe: false,
            require_tool_probe: false,
        }
    }
}
