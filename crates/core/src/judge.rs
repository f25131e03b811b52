//! Picking a winner among several successful candidate responses.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::adapter::Completer;
use crate::error::{GatewayError, Result};
use crate::request_context::RequestContext;
use crate::schema::{Response, ResponseBlock, StopReason};

/// One candidate as seen by a judge: the response plus how long it took
/// and whether the route expected tool use.
pub struct Candidate<'a> {
    pub adapter: &'a str,
    pub response: &'a Response,
    pub latency_ms: u64,
}

#[async_trait]
pub trait Judge: Send + Sync {
    /// Returns the index into `candidates` of the chosen response.
    async fn judge(&self, ctx: &RequestContext, candidates: &[Candidate<'_>], tools_expected: bool) -> Result<usize>;
}

/// Scores candidates with a fixed formula; never fails.
pub struct HeuristicJudge;

impl HeuristicJudge {
    pub fn score(candidate: &Candidate<'_>, tools_expected: bool) -> f64 {
        let response = candidate.response;
        let text_len = response.text().len();
        let mut score = (text_len as f64 / 24.0).min(18.0);

        score += match response.stop_reason {
            StopReason::EndTurn => 6.0,
            StopReason::ToolUse => 2.0,
            _ => 0.0,
        };

        score += (response.usage.output_tokens as f64 / 50.0).min(8.0);

        let has_tool_use = response.blocks.iter().any(|b| matches!(b, ResponseBlock::ToolUse { .. }));
        score += match (tools_expected, has_tool_use) {
            (true, true) => 10.0,
            (true, false) => -8.0,
            (false, true) => -2.0,
            (false, false) => 0.0,
        };

        score -= (candidate.latency_ms as f64 / 250.0).min(6.0);

        score
    }
}

#[async_trait]
impl Judge for HeuristicJudge {
    async fn judge(&self, _ctx: &RequestContext, candidates: &[Candidate<'_>], tools_expected: bool) -> Result<usize> {
        let mut best_index = 0;
        let mut best_score = f64::MIN;
        let mut best_latency = u64::MAX;

        for (index, candidate) in candidates.iter().enumerate() {
            let score = Self::score(candidate, tools_expected);
            let better = score > best_score || (score == best_score && candidate.latency_ms < best_latency);
            if better {
                best_index = index;
                best_score = score;
                best_latency = candidate.latency_ms;
            }
        }

        Ok(best_index)
    }
}

/// Asks a named model, via an existing [`Completer`], which candidate is
/// best. Falls back to priority selection (handled by the router) on
/// any parse or transport failure.
pub struct LlmJudge<'a> {
    completer: &'a dyn Completer,
    model: String,
}

impl<'a> LlmJudge<'a> {
    pub fn new(completer: &'a dyn Completer, model: impl Into<String>) -> Self {
        Self {
            completer,
            model: model.into(),
        }
    }

    fn build_prompt(candidates: &[Candidate<'_>]) -> String {
        #[derive(Serialize)]
        struct PromptCandidate {
            index: usize,
            adapter: String,
            latency_ms: u64,
            stop_reason: StopReason,
            text: String,
            tools: Vec<String>,
        }

        let entries: Vec<PromptCandidate> = candidates
            .iter()
            .enumerate()
            .map(|(index, c)| {
                let mut text = c.response.text();
                text.truncate(800);
                let mut tools: Vec<String> = c.response.tool_names().into_iter().map(String::from).collect();
                tools.sort();

                PromptCandidate {
                    index,
                    adapter: c.adapter.to_string(),
                    latency_ms: c.latency_ms,
                    stop_reason: c.response.stop_reason,
                    text,
                    tools,
                }
            })
            .collect();

        serde_json::to_string(&json!({ "candidates": entries })).unwrap_or_default()
    }

    fn parse_index(raw: &str, candidate_count: usize) -> Result<usize> {
        #[derive(Deserialize)]
        struct IndexOnly {
            index: i64,
        }

        let index = serde_json::from_str::<IndexOnly>(raw.trim())
            .map(|v| v.index)
            .or_else(|_| {
                let re = Regex::new(r"-?\d+").expect("valid regex");
                re.find(raw)
                    .and_then(|m| m.as_str().parse::<i64>().ok())
                    .ok_or_else(|| GatewayError::Protocol {
                        adapter: "judge".to_string(),
                        message: "judge response contained no integer".to_string(),
                    })
            })?;

        if index < 0 || index as usize >= candidate_count {
            return Err(GatewayError::Protocol {
                adapter: "judge".to_string(),
                message: format!("judge returned out-of-range index {index}"),
            });
        }

        Ok(index as usize)
    }
}

#[async_trait]
impl Judge for LlmJudge<'_> {
    async fn judge(&self, ctx: &RequestContext, candidates: &[Candidate<'_>], _tools_expected: bool) -> Result<usize> {
        let prompt = Self::build_prompt(candidates);
        let system = "You are judging which candidate answer best satisfies the user's request. \
            Respond with only a JSON object of the form {\"index\": N} naming the winning candidate.";

        let raw = self.completer.complete_simple(ctx, &self.model, system, &prompt).await?;
        Self::parse_index(&raw, candidates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Usage;

    fn response(text: &str, stop_reason: StopReason, output_tokens: u32) -> Response {
        Response {
            model: "m".into(),
            blocks: vec![ResponseBlock::Text { text: text.into() }],
            stop_reason,
            usage: Usage {
                input_tokens: 0,
                output_tokens,
            },
            trace: Default::default(),
        }
    }

    #[tokio::test]
    async fn heuristic_judge_prefers_longer_complete_answer() {
        let short = response("ok", StopReason::EndTurn, 1);
        let long = response(&"a complete sentence worth something".repeat(2), StopReason::EndTurn, 40);

        let candidates = vec![
            Candidate {
                adapter: "fast-short",
                response: &short,
                latency_ms: 10,
            },
            Candidate {
                adapter: "slow-better",
                response: &long,
                latency_ms: 25,
            },
        ];

        let judge = HeuristicJudge;
        let winner = judge.judge(&RequestContext::default(), &candidates, false).await.unwrap();
        assert_eq!(winner, 1);
    }

    #[test]
    fn parse_index_accepts_plain_json() {
        let index = LlmJudge::parse_index(r#"{"index": 1}"#, 3).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn parse_index_falls_back_to_regex() {
        let index = LlmJudge::parse_index("I think candidate 2 is best", 3).unwrap();
        assert_eq!(index, 2);
    }

    #[test]
    fn parse_index_rejects_out_of_range() {
        assert!(LlmJudge::parse_index("5", 3).is_err());
    }
}
