//! Per-request runtime carrier, threaded through every adapter call and
//! every sub-call (reflection, judge).
//!
//! Generalized from the upstream gateway's `RequestContext` (which carried
//! BYOK API keys and client identity for rate limiting — both out of
//! scope here) down to the deadline/cancellation/tracing plumbing every
//! adapter call needs regardless of auth model.

use std::time::Duration;

use fastrace::Span;
use fastrace::collector::SpanContext;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub deadline: Option<Instant>,
    pub cancellation: CancellationToken,
    pub span_context: Option<SpanContext>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            deadline: None,
            cancellation: CancellationToken::new(),
            span_context: None,
        }
    }
}

impl RequestContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            ..Default::default()
        }
    }

    /// A child context for a sub-call (reflection pass, judge call) that
    /// shares the same cancellation token but may carry a tighter deadline.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let deadline = match (self.deadline, timeout) {
            (Some(outer), Some(t)) => Some(outer.min(Instant::now() + t)),
            (Some(outer), None) => Some(outer),
            (None, Some(t)) => Some(Instant::now() + t),
            (None, None) => None,
        };

        Self {
            deadline,
            cancellation: self.cancellation.clone(),
            span_context: self.span_context,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn new_span(&self, name: &'static str) -> Span {
        match self.span_context {
            Some(parent) => Span::root(name, parent),
            None => Span::root(name, SpanContext::random()),
        }
    }
}
