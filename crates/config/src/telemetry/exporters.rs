use std::collections::BTreeMap;
use std::time::Duration;

use duration_str::deserialize_duration;
use serde::Deserialize;
use url::Url;

/// Exporters configuration for telemetry.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ExportersConfig {
    /// OTLP exporter configuration.
    pub otlp: OtlpExporterConfig,
}

impl ExportersConfig {
    pub fn otlp(&self) -> &OtlpExporterConfig {
        &self.otlp
    }
}

/// OTLP exporter configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OtlpExporterConfig {
    /// Whether this exporter is enabled.
    pub enabled: bool,

    /// OTLP endpoint URL.
    pub endpoint: Url,

    /// OTLP protocol selection.
    pub protocol: OtlpProtocol,

    /// Request timeout.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,

    /// Batch export configuration.
    pub batch_export: BatchExportConfig,

    /// gRPC configuration (mutually exclusive with http).
    pub grpc: Option<OtlpGrpcConfig>,

    /// HTTP configuration (mutually exclusive with grpc).
    pub http: Option<OtlpHttpConfig>,
}

impl Default for OtlpExporterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: Url::parse("http://localhost:4317").expect("default URL should be valid"),
            protocol: OtlpProtocol::default(),
            timeout: Duration::from_secs(60),
            batch_export: BatchExportConfig::default(),
            grpc: None,
            http: None,
        }
    }
}

impl OtlpExporterConfig {
    /// Validate that the protocol configuration matches the selected protocol.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.protocol {
            OtlpProtocol::Grpc if self.http.is_some() => {
                anyhow::bail!("HTTP configuration found but protocol is set to 'grpc'");
            }
            OtlpProtocol::Http if self.grpc.is_some() => {
                anyhow::bail!("gRPC configuration found but protocol is set to 'http'");
            }
            _ => {}
        }

        if self.grpc.is_some() && self.http.is_some() {
            anyhow::bail!("cannot configure both 'grpc' and 'http' for an OTLP exporter, choose one");
        }

        Ok(())
    }
}

/// gRPC-specific configuration for OTLP.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct OtlpGrpcConfig {
    /// gRPC metadata to include with requests. Keys starting with
    /// `grpc-` are reserved and rejected at validation time.
    pub headers: BTreeMap<String, String>,

    /// TLS configuration for secure connections.
    pub tls: Option<OtlpGrpcTlsConfig>,
}

impl OtlpGrpcConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for key in self.headers.keys() {
            if key.starts_with("grpc-") {
                anyhow::bail!("gRPC metadata key '{key}' cannot start with 'grpc-' (reserved)");
            }
        }
        Ok(())
    }
}

/// TLS configuration for OTLP gRPC connections.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct OtlpGrpcTlsConfig {
    /// Domain name for TLS verification (SNI).
    pub domain_name: Option<String>,
    /// Path to the client private key PEM file.
    pub key: Option<String>,
    /// Path to the client certificate PEM file.
    pub cert: Option<String>,
    /// Path to the CA certificate PEM file.
    pub ca: Option<String>,
}

/// HTTP-specific configuration for OTLP.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct OtlpHttpConfig {
    /// HTTP headers to include with requests.
    pub headers: BTreeMap<String, String>,
}

/// OTLP protocol selection.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    /// gRPC protocol (default).
    #[default]
    Grpc,
    /// HTTP/protobuf protocol.
    Http,
}

/// Batch export configuration for OTLP.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchExportConfig {
    /// Delay between batch exports.
    #[serde(deserialize_with = "deserialize_duration", default = "default_scheduled_delay")]
    pub scheduled_delay: Duration,
    /// Maximum queue size.
    pub max_queue_size: usize,
    /// Maximum batch size for export.
    pub max_export_batch_size: usize,
    /// Maximum concurrent exports.
    pub max_concurrent_exports: usize,
}

impl Default for BatchExportConfig {
    fn default() -> Self {
        Self {
            scheduled_delay: default_scheduled_delay(),
            max_queue_size: 2048,
            max_export_batch_size: 512,
            max_concurrent_exports: 1,
        }
    }
}

fn default_scheduled_delay() -> Duration {
    Duration::from_secs(5)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn grpc_headers_valid() {
        let config: ExportersConfig = toml::from_str(indoc! {r#"
            [otlp]
            enabled = true
            protocol = "grpc"

            [otlp.grpc.headers]
            authorization = "Bearer token"
            x-custom-header = "value123"
        "#})
        .unwrap();

        let grpc = config.otlp.grpc.as_ref().unwrap();
        assert_eq!(grpc.headers.len(), 2);
        assert!(grpc.validate().is_ok());
        assert_eq!(config.otlp.protocol, OtlpProtocol::Grpc);
    }

    #[test]
    fn grpc_headers_reserved_prefix_rejected() {
        let config: ExportersConfig = toml::from_str(indoc! {r#"
            [otlp]
            enabled = true

            [otlp.grpc.headers]
            grpc-status = "0"
        "#})
        .unwrap();

        assert!(config.otlp.grpc.as_ref().unwrap().validate().is_err());
    }

    #[test]
    fn both_protocol_configs_rejected() {
        let config: OtlpExporterConfig = toml::from_str(indoc! {r#"
            enabled = true
            protocol = "grpc"
            [grpc]
            [http]
        "#})
        .unwrap();

        assert!(config.validate().is_err());
    }
}
