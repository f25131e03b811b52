//! Gateway error taxonomy.
//!
//! Mirrors the upstream gateway's `LlmError`: one `thiserror` enum at the
//! crate boundary, with structured context on every variant so callers
//! don't need to string-match — except the one place the spec itself
//! requires a string match (the "model not found" heuristic in
//! [`crate::scheduler`]).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The adapter's upstream doesn't know this model. Durable per-model
    /// fact once observed; see `scheduler::looks_like_model_not_found`.
    #[error("model '{model}' not found on adapter '{adapter}'")]
    ModelNotFound { adapter: String, model: String },

    /// Network dial/read/timeout talking to an upstream. Retryable.
    #[error("transport error calling '{adapter}': {source}")]
    Transport {
        adapter: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response, malformed JSON, empty choices, empty stream.
    /// Routing-equivalent to Transport, but never retried within the
    /// same adapter.
    #[error("protocol error from '{adapter}': {message}")]
    Protocol { adapter: String, message: String },

    /// Adapter doesn't support the requested tool semantics at all.
    #[error("adapter '{adapter}' does not implement tool calls")]
    ToolNotImplemented { adapter: String },

    /// `strict_stream_passthrough` was requested but this adapter can't
    /// relay its upstream's stream verbatim in the client's dialect.
    /// Recoverable: the router may soft-fallback to a synthesized stream.
    #[error("adapter '{adapter}' cannot satisfy strict stream passthrough")]
    StrictPassthroughUnsupported { adapter: String },

    /// The caller's context was cancelled or its deadline elapsed.
    #[error("request cancelled or timed out")]
    Cancelled,

    /// Adapter has no `Stream` capability.
    #[error("adapter '{adapter}' does not support streaming")]
    StreamingNotSupported { adapter: String },

    /// Every candidate adapter failed, or none were available to try.
    #[error("{0}")]
    NoUpstreamAvailable(String),

    /// A hook handler aborted the chain.
    #[error("hook '{name}' aborted: {message}")]
    HookAborted { name: String, message: String },

    /// Child process (script adapter) misbehaved.
    #[error("script adapter '{adapter}' error: {message}")]
    ScriptAdapter { adapter: String, message: String },

    /// Surfaced from admin/config update operations; the prior
    /// configuration is preserved unchanged.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Case-insensitive substring match against the upstream error text,
    /// used by the scheduler to durably mark a model as nonexistent on
    /// an adapter. Kept centralized so the heuristic lives in one place.
    pub fn looks_like_model_not_found(text: &str) -> bool {
        const NEEDLES: &[&str] = &[
            "model not found",
            "unknown model",
            "invalid model",
            "no such model",
            "model does not exist",
        ];
        let lower = text.to_lowercase();
        NEEDLES.iter().any(|needle| lower.contains(needle))
    }

    /// Best-effort text for logging, scheduler observation, and the
    /// client-facing error on total failure.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, GatewayError::Cancelled)
    }
}
