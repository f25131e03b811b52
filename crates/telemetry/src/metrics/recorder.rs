//! Per-operation metrics recorder for GenAI client calls.
//!
//! Accumulates attributes and token counts over the lifetime of a single
//! gateway request, then records the operation duration and token usage
//! histograms when dropped. Callers push whatever attributes are known up
//! front, set the token counts once the response lands, and let `Drop` do
//! the recording so a call that returns early on error still gets measured.

use std::time::Instant;

use opentelemetry::{Key, Value, metrics::Histogram};

use crate::KeyValue;
use crate::attributes::{GEN_AI_RESPONSE_MODEL, GEN_AI_TOKEN_TYPE};
use crate::metrics::{GEN_AI_CLIENT_OPERATION_DURATION, GEN_AI_CLIENT_TOKEN_USAGE};

pub struct Recorder {
    start: Instant,
    duration_histogram: Histogram<f64>,
    token_usage_histogram: Histogram<u64>,
    attributes: Vec<KeyValue>,
    error_type: Option<String>,
    input_tokens: u64,
    output_tokens: u64,
    response_model: Option<String>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            duration_histogram: super::meter().f64_histogram(GEN_AI_CLIENT_OPERATION_DURATION).with_unit("s").build(),
            token_usage_histogram: super::meter().u64_histogram(GEN_AI_CLIENT_TOKEN_USAGE).build(),
            attributes: Vec::new(),
            error_type: None,
            input_tokens: 0,
            output_tokens: 0,
            response_model: None,
        }
    }

    pub fn push_attribute<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        self.attributes.push(KeyValue::new(key, value));
    }

    pub fn set_error_type(&mut self, error_type: impl Into<String>) {
        self.error_type = Some(error_type.into());
    }

    pub fn set_response_model(&mut self, model: impl Into<String>) {
        self.response_model = Some(model.into());
    }

    pub fn record_tokens(&mut self, input_tokens: u64, output_tokens: u64) {
        self.input_tokens += input_tokens;
        self.output_tokens += output_tokens;
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(error_type) = self.error_type.take() {
            self.push_attribute("error.type", error_type);
        }
        if let Some(model) = self.response_model.take() {
            self.push_attribute(GEN_AI_RESPONSE_MODEL, model);
        }

        self.duration_histogram.record(self.start.elapsed().as_secs_f64(), &self.attributes);

        if self.input_tokens > 0 {
            self.push_attribute(GEN_AI_TOKEN_TYPE, "input");
            self.token_usage_histogram.record(self.input_tokens, &self.attributes);
            self.attributes.pop();
        }
        if self.output_tokens > 0 {
            self.push_attribute(GEN_AI_TOKEN_TYPE, "output");
            self.token_usage_histogram.record(self.output_tokens, &self.attributes);
        }
    }
}
