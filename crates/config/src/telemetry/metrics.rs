use serde::Deserialize;

use super::ExportersConfig;

/// Metrics-specific telemetry configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Exporters specific to metrics. Falls back to the global exporters
    /// when absent.
    pub exporters: Option<ExportersConfig>,
}

impl MetricsConfig {
    pub fn exporters(&self) -> Option<&ExportersConfig> {
        self.exporters.as_ref()
    }
}
