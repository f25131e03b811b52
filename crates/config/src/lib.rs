//! Typed configuration for the gateway: adapters, routes, and the
//! scheduler/probe/election/dispatcher/router knobs that drive them.

mod adapters;
mod dispatcher;
mod election;
mod error;
mod loader;
mod probe;
mod routes;
mod router;
mod scheduler;
mod telemetry;

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

pub use adapters::{
    AdapterConfig, AnthropicAdapterConfig, CanonicalAdapterConfig, GeminiAdapterConfig, OpenAiAdapterConfig,
    ScriptAdapterConfig,
};
pub use dispatcher::DispatcherConfig;
pub use election::ElectionConfig;
pub use error::ConfigError;
pub use probe::ProbeConfig;
pub use router::{JudgeConfig, JudgeStrategy, RouterConfig};
pub use routes::RoutesConfig;
pub use scheduler::SchedulerConfig;
pub use telemetry::OtlpProtocol;
pub use telemetry::exporters::{
    BatchExportConfig, ExportersConfig, OtlpExporterConfig, OtlpGrpcConfig, OtlpGrpcTlsConfig, OtlpHttpConfig,
};
pub use telemetry::tracing::{CollectConfig, PropagationConfig, TracingConfig};
pub use telemetry::{LogsConfig, MetricsConfig, TelemetryConfig};

/// Root configuration for the gateway core and its HTTP edge binary.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Named upstream adapters, keyed by the name other config sections
    /// (routes, judge, dispatcher fallback) reference.
    pub adapters: IndexMap<String, AdapterConfig>,

    /// Model pattern → adapter name routing table.
    pub routes: RoutesConfig,

    pub scheduler: SchedulerConfig,

    pub probe: ProbeConfig,

    pub election: ElectionConfig,

    pub dispatcher: DispatcherConfig,

    pub router: RouterConfig,

    pub telemetry: TelemetryConfig,
}

impl GatewayConfig {
    /// Load configuration from a TOML file, expanding `{{ env.VAR }}`
    /// placeholders and validating cross-references (routes and the
    /// judge adapter must name configured adapters).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        loader::load(path)
    }

    /// Parse configuration from a TOML string. Exposed directly for
    /// tests and for embedding the loader in tools other than the
    /// binary.
    pub fn load_str(content: &str) -> Result<Self, ConfigError> {
        loader::load_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_no_adapters() {
        let config = GatewayConfig::default();
        assert!(config.adapters.is_empty());
        assert_eq!(config.scheduler.failure_threshold, 3);
        assert_eq!(config.election.min_score_difference, 5.0);
    }
}
