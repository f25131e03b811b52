//! Subprocess adapter speaking the `ccgateway.script_adapter.v1` NDJSON
//! protocol over stdin/stdout.
//!
//! One envelope in, one object (complete mode) or NDJSON lines (stream
//! mode) out. Bounded stdout, truncated stderr, per-call timeout.

use std::process::Stdio;

use async_trait::async_trait;
use config::ScriptAdapterConfig;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use super::{AdapterKind, AdapterSpec, EventStream};
use crate::error::{GatewayError, Result};
use crate::request_context::RequestContext;
use crate::schema::{Request, Response, ResponseBlock, StopReason, Usage};
use crate::stream::{StreamEvent, synthesize_stream};

const PROTOCOL_VERSION: &str = "ccgateway.script_adapter.v1";
const MAX_STDERR_CHARS: usize = 800;

pub struct ScriptAdapter {
    name: String,
    config: ScriptAdapterConfig,
}

impl ScriptAdapter {
    pub fn new(name: impl Into<String>, config: ScriptAdapterConfig) -> Self {
        Self { name: name.into(), config }
    }

    fn command(&self) -> Result<Command> {
        let Some((program, args)) = self.config.command.split_first() else {
            return Err(GatewayError::Configuration(format!(
                "script adapter '{}' has an empty command",
                self.name
            )));
        };

        let mut command = Command::new(program);
        command.args(args);
        command.stdin(Stdio::piped());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        for (key, value) in &self.config.env {
            command.env(key, value.as_str());
        }

        Ok(command)
    }

    async fn run(&self, mode: &str, req: &Request) -> Result<Vec<u8>> {
        #[derive(Serialize)]
        struct Envelope<'a> {
            version: &'a str,
            mode: &'a str,
            request: &'a Request,
        }

        let mut command = self.command()?;

        let mut child = command.spawn().map_err(|e| GatewayError::ScriptAdapter {
            adapter: self.name.clone(),
            message: format!("failed to spawn: {e}"),
        })?;

        let envelope = Envelope {
            version: PROTOCOL_VERSION,
            mode,
            request: req,
        };
        let payload = serde_json::to_vec(&envelope)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await.map_err(|e| GatewayError::ScriptAdapter {
                adapter: self.name.clone(),
                message: format!("failed to write stdin: {e}"),
            })?;
        }

        let mut stdout = Vec::new();
        if let Some(mut out) = child.stdout.take() {
            let limit = self.config.max_output_bytes;
            let mut buf = [0u8; 8192];
            loop {
                let n = out.read(&mut buf).await.map_err(|e| GatewayError::ScriptAdapter {
                    adapter: self.name.clone(),
                    message: format!("failed to read stdout: {e}"),
                })?;
                if n == 0 {
                    break;
                }
                let remaining = limit.saturating_sub(stdout.len());
                stdout.extend_from_slice(&buf[..n.min(remaining)]);
                if stdout.len() >= limit {
                    break;
                }
            }
        }

        let mut stderr = String::new();
        if let Some(mut err) = child.stderr.take() {
            let mut reader = BufReader::new(&mut err);
            let _ = reader.read_to_string(&mut stderr).await;
        }
        stderr.truncate(MAX_STDERR_CHARS);

        let timeout = self.config.timeout;
        let status = tokio::time::timeout(timeout, child.wait())
            .await
            .map_err(|_| GatewayError::ScriptAdapter {
                adapter: self.name.clone(),
                message: format!("timed out after {timeout:?}"),
            })?
            .map_err(|e| GatewayError::ScriptAdapter {
                adapter: self.name.clone(),
                message: format!("wait failed: {e}"),
            })?;

        if !status.success() {
            return Err(GatewayError::ScriptAdapter {
                adapter: self.name.clone(),
                message: format!("exited with {status}: {stderr}"),
            });
        }

        Ok(stdout)
    }
}

fn parse_complete_response(model: &str, body: &Value) -> Response {
    let text = body["text"]
        .as_str()
        .or_else(|| body["content"].as_str())
        .unwrap_or_default();

    let blocks = if let Some(blocks) = body["blocks"].as_array() {
        blocks
            .iter()
            .filter_map(|b| serde_json::from_value::<ResponseBlock>(b.clone()).ok())
            .collect()
    } else if !text.is_empty() {
        vec![ResponseBlock::Text { text: text.to_string() }]
    } else {
        Vec::new()
    };

    let stop_reason = body["stop_reason"]
        .as_str()
        .or_else(|| body["stop"].as_str())
        .or_else(|| body["finish_reason"].as_str())
        .and_then(|s| match s {
            "tool_use" | "tool_calls" => Some(StopReason::ToolUse),
            "max_tokens" | "length" => Some(StopReason::MaxTokens),
            "stop_sequence" => Some(StopReason::StopSequence),
            "end_turn" | "stop" => Some(StopReason::EndTurn),
            _ => None,
        })
        .unwrap_or(StopReason::EndTurn);

    let usage = Usage {
        input_tokens: body["usage"]["input_tokens"]
            .as_u64()
            .or_else(|| body["usage"]["prompt_tokens"].as_u64())
            .unwrap_or(0) as u32,
        output_tokens: body["usage"]["output_tokens"]
            .as_u64()
            .or_else(|| body["usage"]["completion_tokens"].as_u64())
            .unwrap_or(0) as u32,
    };

    Response {
        model: body["model"].as_str().unwrap_or(model).to_string(),
        blocks,
        stop_reason,
        usage,
        trace: Default::default(),
    }
}

#[async_trait]
impl super::Adapter for ScriptAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _ctx: &RequestContext, req: &Request) -> Result<Response> {
        let stdout = self.run("complete", req).await?;
        let body: Value = serde_json::from_slice(&stdout).map_err(|e| GatewayError::ScriptAdapter {
            adapter: self.name.clone(),
            message: format!("invalid JSON from child: {e}"),
        })?;
        Ok(parse_complete_response(&req.model, &body))
    }

    async fn stream(&self, _ctx: &RequestContext, req: &Request) -> Result<EventStream> {
        let stdout = self.run("stream", req).await?;

        let mut events = Vec::new();
        let mut fallback_response = None;

        for line in stdout.split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }

            let frame: Value = match serde_json::from_slice(line) {
                Ok(v) => v,
                Err(_) => continue,
            };

            match frame["type"].as_str() {
                Some("event") => {
                    if let Ok(event) = serde_json::from_value::<StreamEvent>(frame["event"].clone()) {
                        events.push(event);
                    }
                }
                Some("response") => {
                    if let Ok(response) = serde_json::from_value::<Response>(frame["response"].clone()) {
                        fallback_response = Some(response);
                    }
                }
                Some("error") => {
                    return Err(GatewayError::ScriptAdapter {
                        adapter: self.name.clone(),
                        message: frame["error"].as_str().unwrap_or("unknown child error").to_string(),
                    });
                }
                _ => {}
            }
        }

        if events.is_empty()
            && let Some(response) = fallback_response
        {
            events = synthesize_stream(&response);
        }

        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn model_hint(&self) -> Option<Vec<String>> {
        self.config.models.clone()
    }

    fn admin_spec(&self) -> AdapterSpec {
        AdapterSpec {
            name: self.name.clone(),
            kind: AdapterKind::Script,
            supports_streaming: true,
            supports_tools: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_complete_body() {
        let body: Value = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        let response = parse_complete_response("m1", &body);
        assert_eq!(response.text(), "hello");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
    }

    #[test]
    fn parses_alternate_field_names() {
        let body: Value = serde_json::from_str(
            r#"{"content": "hi", "finish_reason": "length", "usage": {"prompt_tokens": 5, "completion_tokens": 2}}"#,
        )
        .unwrap();
        let response = parse_complete_response("m1", &body);
        assert_eq!(response.stop_reason, StopReason::MaxTokens);
        assert_eq!(response.usage.input_tokens, 5);
        assert_eq!(response.usage.output_tokens, 2);
    }
}
