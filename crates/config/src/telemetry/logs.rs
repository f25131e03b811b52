use serde::Deserialize;

use super::ExportersConfig;

/// Logs-specific telemetry configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct LogsConfig {
    /// Exporters specific to logs. Falls back to the global exporters
    /// when absent.
    pub exporters: Option<ExportersConfig>,
}

impl LogsConfig {
    pub fn exporters(&self) -> Option<&ExportersConfig> {
        self.exporters.as_ref()
    }
}
