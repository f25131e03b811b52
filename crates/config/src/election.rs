use serde::Deserialize;

/// Scheduler/worker election parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElectionConfig {
    pub enabled: bool,

    /// Minimum gap between the top two intelligence scores for the
    /// result to be reported as a clear win rather than a tiebreak.
    pub min_score_difference: f64,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_score_difference: 5.0,
        }
    }
}
