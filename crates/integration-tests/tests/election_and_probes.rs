//! Scheduler/worker election feeding the complexity dispatcher, and
//! tool-probe gating in the health scheduler.

use std::sync::Arc;

use config::{DispatcherConfig, ElectionConfig, RouterConfig, RoutesConfig, SchedulerConfig};
use gateway_core::{Dispatcher, Election, ModelProbeFacts, RequestContext, Router, Scheduler};
use integration_tests::{fixed_response, user_request, user_request_with_tool, DelayedAdapter};

#[tokio::test]
async fn election_elects_highest_scorer_and_dispatcher_routes_workers_first() {
    let election = Arc::new(Election::new(ElectionConfig::default()));
    let result = election
        .elect(vec![("smart".to_string(), 90.0), ("w1".to_string(), 60.0), ("w2".to_string(), 50.0)])
        .expect("three scored adapters must produce an election result");

    assert_eq!(result.scheduler, "smart");
    assert_eq!(result.workers, vec!["w1".to_string(), "w2".to_string()]);
    assert_eq!(result.reason, gateway_core::ElectionReason::HighestIntelligenceScore);

    let routes = RoutesConfig::default();
    let scheduler = Arc::new(Scheduler::new(SchedulerConfig::default()));
    let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig {
        enabled: true,
        fallback_to_scheduler: false,
        ..DispatcherConfig::default()
    }));
    let router = Router::new(routes, RouterConfig::default(), scheduler, election, dispatcher);

    router.register_adapter(Arc::new(DelayedAdapter::new("smart", fixed_response("scheduler answer"), std::time::Duration::ZERO)));
    router.register_adapter(Arc::new(DelayedAdapter::new("w1", fixed_response("worker one answer"), std::time::Duration::ZERO)));
    router.register_adapter(Arc::new(DelayedAdapter::new("w2", fixed_response("worker two answer"), std::time::Duration::ZERO)));

    let ctx = RequestContext::default();
    let req = user_request("m1", "what is the capital of France", 64);
    let response = router.complete(&ctx, &req).await.expect("one of the elected workers should answer a simple request");

    assert!(response.trace.provider == "w1" || response.trace.provider == "w2", "a simple request must route to a worker, not the scheduler");
}

#[tokio::test]
async fn tool_probe_gating_skips_the_adapter_that_failed_its_tool_probe() {
    let routes = RoutesConfig {
        default: vec!["a1".to_string(), "a2".to_string()],
        ..RoutesConfig::default()
    };
    let scheduler = Arc::new(Scheduler::new(SchedulerConfig {
        require_tool_probe: true,
        ..SchedulerConfig::default()
    }));
    let election = Arc::new(Election::new(ElectionConfig { enabled: false, ..ElectionConfig::default() }));
    let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig { enabled: false, ..DispatcherConfig::default() }));

    scheduler.register("a1");
    scheduler.register("a2");
    scheduler.observe_probe(
        "a1",
        "m1",
        ModelProbeFacts {
            tool_known: true,
            tool_ok: false,
            ..ModelProbeFacts::default()
        },
    );
    scheduler.observe_probe(
        "a2",
        "m1",
        ModelProbeFacts {
            tool_known: true,
            tool_ok: true,
            ..ModelProbeFacts::default()
        },
    );

    let router = Router::new(routes, RouterConfig::default(), scheduler, election, dispatcher);
    router.register_adapter(Arc::new(DelayedAdapter::new("a1", fixed_response("a1 shouldn't be picked"), std::time::Duration::ZERO)));
    router.register_adapter(Arc::new(DelayedAdapter::new("a2", fixed_response("a2 has a working tool probe"), std::time::Duration::ZERO)));

    let ctx = RequestContext::default();
    let req = user_request_with_tool("m1", "what's the weather in Paris");
    let response = router.complete(&ctx, &req).await.expect("a2 should be dispatched to");

    assert_eq!(response.trace.provider, "a2");
}
