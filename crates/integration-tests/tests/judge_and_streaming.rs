//! Parallel candidate racing with judge selection, and the streaming
//! strict-passthrough soft-fallback path.

use std::sync::Arc;
use std::time::Duration;

use config::{DispatcherConfig, ElectionConfig, JudgeConfig, JudgeStrategy, RouterConfig, RoutesConfig, SchedulerConfig};
use gateway_core::{Dispatcher, Election, RequestContext, Router, Scheduler, SelectedBy, StreamEvent};
use integration_tests::{fixed_response, user_request, DelayedAdapter, NoPassthroughAdapter};

#[tokio::test]
async fn judge_picks_the_longer_more_complete_answer() {
    let routes = RoutesConfig {
        default: vec!["fast-short".to_string(), "slow-better".to_string()],
        ..RoutesConfig::default()
    };
    let router_config = RouterConfig {
        parallel_candidates: 2,
        enable_response_judge: true,
        judge: JudgeConfig {
            strategy: JudgeStrategy::Heuristic,
            ..JudgeConfig::default()
        },
        ..RouterConfig::default()
    };

    let scheduler = Arc::new(Scheduler::new(SchedulerConfig::default()));
    let election = Arc::new(Election::new(ElectionConfig { enabled: false, ..ElectionConfig::default() }));
    let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig { enabled: false, ..DispatcherConfig::default() }));
    let router = Router::new(routes, router_config, scheduler, election, dispatcher);

    router.register_adapter(Arc::new(DelayedAdapter::new("fast-short", fixed_response("ok"), Duration::from_millis(10))));
    router.register_adapter(Arc::new(DelayedAdapter::new(
        "slow-better",
        fixed_response("Here is a much more thorough and complete answer to your question."),
        Duration::from_millis(25),
    )));

    let ctx = RequestContext::default();
    let req = user_request("m1", "explain it to me", 256);
    let response = router.complete(&ctx, &req).await.expect("both candidates should complete");

    assert_eq!(response.trace.provider, "slow-better");
    assert_eq!(response.trace.selected_by, SelectedBy::Judge);
    assert_eq!(response.trace.candidate_count, 2);
}

#[tokio::test]
async fn strict_passthrough_soft_falls_back_to_synthesized_stream() {
    let routes = RoutesConfig {
        default: vec!["anthropic-like".to_string()],
        ..RoutesConfig::default()
    };
    let scheduler = Arc::new(Scheduler::new(SchedulerConfig::default()));
    let election = Arc::new(Election::new(ElectionConfig { enabled: false, ..ElectionConfig::default() }));
    let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig { enabled: false, ..DispatcherConfig::default() }));
    let router = Router::new(routes, RouterConfig::default(), scheduler, election, dispatcher);

    router.register_adapter(Arc::new(NoPassthroughAdapter::new("anthropic-like", fixed_response("streamed answer"))));

    let ctx = RequestContext::default();
    let mut req = user_request("m1", "stream this", 64);
    req.stream = true;
    req.metadata.insert("strict_stream_passthrough".to_string(), serde_json::json!(true));
    req.metadata.insert("strict_stream_passthrough_soft".to_string(), serde_json::json!(true));

    let mut events = router.stream(&ctx, &req).await.expect("soft fallback must synthesize a stream, not error");

    use futures::StreamExt;
    let mut last = None;
    while let Some(event) = events.next().await {
        last = Some(event.expect("synthesized events never carry a transport error"));
    }

    assert!(matches!(last, Some(StreamEvent::MessageStop)), "synthesized stream must end in MessageStop");
}
