use serde::Deserialize;

use super::ExportersConfig;

/// Tracing-specific telemetry configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TracingConfig {
    /// Fraction of requests to sample, 0.0-1.0.
    pub sampling: f64,

    /// Whether a sampled parent forces its children to be sampled too.
    pub parent_based_sampler: bool,

    /// Span collection limits, forwarded to the fastrace collector.
    pub collect: CollectConfig,

    /// Trace context propagation formats accepted on inbound requests.
    pub propagation: PropagationConfig,

    /// Exporters specific to traces. Falls back to the global exporters
    /// when absent.
    pub exporters: Option<ExportersConfig>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            sampling: 0.15,
            parent_based_sampler: false,
            collect: CollectConfig::default(),
            propagation: PropagationConfig::default(),
            exporters: None,
        }
    }
}

impl TracingConfig {
    pub fn exporters(&self) -> Option<&ExportersConfig> {
        self.exporters.as_ref()
    }
}

/// Limits applied to span collection before export.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectConfig {
    pub max_events_per_span: usize,
    pub max_attributes_per_span: usize,
    pub max_links_per_span: usize,
    pub max_attributes_per_event: usize,
    pub max_attributes_per_link: usize,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            max_events_per_span: 128,
            max_attributes_per_span: 128,
            max_links_per_span: 128,
            max_attributes_per_event: 128,
            max_attributes_per_link: 128,
        }
    }
}

/// Which inbound trace context propagation formats to honor.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PropagationConfig {
    pub trace_context: bool,
    pub aws_xray: bool,
}
