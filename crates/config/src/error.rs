use thiserror::Error;

/// Errors surfaced while loading or validating a [`crate::GatewayConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to expand dynamic string at '{path}': {source}")]
    DynamicString {
        path: String,
        #[source]
        source: serde_dynamic_string::MissingEnvVar,
    },

    #[error("{0}")]
    Invalid(String),
}
