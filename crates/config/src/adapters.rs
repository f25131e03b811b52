use std::collections::BTreeMap;
use std::time::Duration;

use duration_str::deserialize_duration;
use secrecy::SecretString;
use serde::Deserialize;
use serde_dynamic_string::DynamicString;

/// One upstream integration, named and configured by the operator.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum AdapterConfig {
    OpenAi(OpenAiAdapterConfig),
    Anthropic(AnthropicAdapterConfig),
    Gemini(GeminiAdapterConfig),
    Canonical(CanonicalAdapterConfig),
    Script(ScriptAdapterConfig),
}

impl AdapterConfig {
    pub fn model_hint(&self) -> Option<&[String]> {
        match self {
            AdapterConfig::OpenAi(c) => c.models.as_deref(),
            AdapterConfig::Anthropic(c) => c.models.as_deref(),
            AdapterConfig::Gemini(c) => c.models.as_deref(),
            AdapterConfig::Canonical(_) => None,
            AdapterConfig::Script(c) => c.models.as_deref(),
        }
    }
}

fn default_base_url(url: &str) -> DynamicString {
    DynamicString::from(url.to_string())
}

fn default_openai_base_url() -> DynamicString {
    default_base_url("https://api.openai.com/v1")
}

fn default_anthropic_base_url() -> DynamicString {
    default_base_url("https://api.anthropic.com/v1")
}

fn default_gemini_base_url() -> DynamicString {
    default_base_url("https://generativelanguage.googleapis.com/v1beta")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

/// OpenAI-dialect adapter: `/chat/completions`-shaped upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenAiAdapterConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: DynamicString,
    pub api_key: Option<SecretString>,
    pub organization: Option<DynamicString>,
    pub models: Option<Vec<String>>,
    #[serde(deserialize_with = "deserialize_duration", default = "default_request_timeout")]
    pub timeout: Duration,
    pub extra_headers: BTreeMap<String, DynamicString>,
}

impl Default for OpenAiAdapterConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: None,
            organization: None,
            models: None,
            timeout: default_request_timeout(),
            extra_headers: BTreeMap::new(),
        }
    }
}

/// Anthropic Messages-dialect adapter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnthropicAdapterConfig {
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: DynamicString,
    pub api_key: Option<SecretString>,
    pub models: Option<Vec<String>>,
    #[serde(default = "default_anthropic_version")]
    pub anthropic_version: String,
    #[serde(deserialize_with = "deserialize_duration", default = "default_request_timeout")]
    pub timeout: Duration,
    pub extra_headers: BTreeMap<String, DynamicString>,
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

impl Default for AnthropicAdapterConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            api_key: None,
            models: None,
            anthropic_version: default_anthropic_version(),
            timeout: default_request_timeout(),
            extra_headers: BTreeMap::new(),
        }
    }
}

/// Gemini `generateContent`-dialect adapter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeminiAdapterConfig {
    #[serde(default = "default_gemini_base_url")]
    pub base_url: DynamicString,
    pub api_key: Option<SecretString>,
    pub models: Option<Vec<String>>,
    #[serde(deserialize_with = "deserialize_duration", default = "default_request_timeout")]
    pub timeout: Duration,
}

impl Default for GeminiAdapterConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            api_key: None,
            models: None,
            timeout: default_request_timeout(),
        }
    }
}

/// Canonical-echo adapter: speaks the gateway's own schema directly, no
/// translation layer. Used for in-process test doubles and for
/// gateway-to-gateway federation.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct CanonicalAdapterConfig {
    pub base_url: Option<DynamicString>,
    pub api_key: Option<SecretString>,
}

/// Subprocess adapter speaking the `ccgateway.script_adapter.v1` NDJSON
/// protocol over stdin/stdout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptAdapterConfig {
    pub command: Vec<String>,
    pub models: Option<Vec<String>>,
    #[serde(deserialize_with = "deserialize_duration", default = "default_script_timeout")]
    pub timeout: Duration,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    pub env: BTreeMap<String, DynamicString>,
}

fn default_script_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_output_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ScriptAdapterConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            models: None,
            timeout: default_script_timeout(),
            max_output_bytes: default_max_output_bytes(),
            env: BTreeMap::new(),
        }
    }
}
