//! Critique-then-fix self-correction loop run after a candidate has
//! already been selected.
//!
//! Each pass asks the winning adapter to critique its own answer, then
//! asks it to produce a fix if the critique wasn't clean. Sub-calls are
//! plain `Completer`/`complete` calls on that one adapter, never routed
//! back through [`super::Router`], so there is no recursion to guard
//! against.

use crate::adapter::{Adapter, Completer};
use crate::request_context::RequestContext;
use crate::schema::{Content, Message, Request, Response, Role};

use super::Router;

const CLEAN_VERDICT: &str = "GOOD";

fn critique_prompt(original_request: &str, answer: &str) -> String {
    format!(
        "You are reviewing an AI assistant's answer to a user request for correctness and completeness.\n\n\
        Request:\n{original_request}\n\n\
        Answer:\n{answer}\n\n\
        If the answer is correct and complete, reply with exactly the single word {CLEAN_VERDICT}. \
        Otherwise, describe concisely and specifically what is wrong or missing."
    )
}

fn fix_request(original: &Request, answer: &str, critique: &str) -> Request {
    let mut messages = original.messages.clone();
    messages.push(Message {
        role: Role::Assistant,
        content: Content::Text(answer.to_string()),
    });
    messages.push(Message {
        role: Role::User,
        content: Content::Text(format!(
            "A reviewer found a problem with your last answer: {critique}\n\nPlease provide a corrected answer."
        )),
    });

    Request {
        run_id: original.run_id.clone(),
        model: original.model.clone(),
        max_tokens: original.max_tokens,
        system: original.system.clone(),
        messages,
        tools: original.tools.clone(),
        metadata: original.metadata.clone(),
        headers: original.headers.clone(),
        stream: false,
    }
}

/// Run up to `max_passes` critique/fix iterations against `response`,
/// mutating it in place. Stops early once a pass comes back clean.
pub async fn run(router: &Router, ctx: &RequestContext, req: &Request, response: &mut Response, max_passes: u32) {
    let Some(adapter) = router.adapter(&response.trace.provider) else {
        return;
    };

    let mut passes_run = 0;

    for _ in 0..max_passes {
        let answer = response.text();
        if answer.is_empty() {
            break;
        }

        let critique = match adapter
            .complete_simple(ctx, &req.model, "You are a strict but fair reviewer.", &critique_prompt(&req.last_user_text(), &answer))
            .await
        {
            Ok(text) => text,
            Err(_) => break,
        };

        passes_run += 1;

        if critique.trim().eq_ignore_ascii_case(CLEAN_VERDICT) {
            break;
        }

        let fixed = match adapter.complete(ctx, &fix_request(req, &answer, critique.trim())).await {
            Ok(fixed) => fixed,
            Err(_) => break,
        };

        response.usage.add(fixed.usage);
        response.blocks = fixed.blocks;
        response.stop_reason = fixed.stop_reason;
    }

    response.trace.reflection_passes = passes_run;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::canonical::CanonicalAdapter;
    use crate::dispatcher::Dispatcher;
    use crate::election::Election;
    use crate::scheduler::Scheduler;
    use crate::schema::{ResponseBlock, StopReason, Usage};
    use config::{DispatcherConfig, ElectionConfig, RouterConfig, RoutesConfig, SchedulerConfig};
    use std::sync::Arc;

    fn router_with_echo() -> Router {
        let router = Router::new(
            RoutesConfig::default(),
            RouterConfig::default(),
            Arc::new(Scheduler::new(SchedulerConfig::default())),
            Arc::new(Election::new(ElectionConfig::default())),
            Arc::new(Dispatcher::new(DispatcherConfig::default())),
        );
        let clean_verdict = Response {
            model: "m".into(),
            blocks: vec![ResponseBlock::Text { text: CLEAN_VERDICT.into() }],
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
            trace: Default::default(),
        };
        router.register_adapter(Arc::new(CanonicalAdapter::fixed("echo", clean_verdict)));
        router
    }

    fn request() -> Request {
        Request {
            run_id: "r".into(),
            model: "m".into(),
            max_tokens: 10,
            system: None,
            messages: vec![Message {
                role: Role::User,
                content: Content::Text("what is 2+2?".into()),
            }],
            tools: Vec::new(),
            metadata: Default::default(),
            headers: Default::default(),
            stream: false,
        }
    }

    #[tokio::test]
    async fn clean_critique_stops_after_one_pass() {
        let router = router_with_echo();
        let req = request();
        let mut response = Response {
            model: "m".into(),
            blocks: vec![ResponseBlock::Text { text: "4".into() }],
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
            trace: crate::schema::Trace {
                provider: "echo".into(),
                ..Default::default()
            },
        };

        run(&router, &RequestContext::default(), &req, &mut response, 3).await;
        assert_eq!(response.trace.reflection_passes, 1);
    }

    #[tokio::test]
    async fn unknown_provider_is_a_no_op() {
        let router = router_with_echo();
        let req = request();
        let mut response = Response {
            model: "m".into(),
            blocks: vec![ResponseBlock::Text { text: "4".into() }],
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
            trace: crate::schema::Trace {
                provider: "ghost".into(),
                ..Default::default()
            },
        };

        run(&router, &RequestContext::default(), &req, &mut response, 3).await;
        assert_eq!(response.trace.reflection_passes, 0);
    }
}
