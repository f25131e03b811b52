//! Route resolution and retry/failover across the top-level router.

use std::sync::Arc;

use config::{DispatcherConfig, ElectionConfig, RouterConfig, RoutesConfig, SchedulerConfig};
use gateway_core::{Dispatcher, Election, RequestContext, Router, Scheduler, SelectedBy};
use integration_tests::{fixed_response, user_request, DelayedAdapter, FailingAdapter};

fn test_router(routes: RoutesConfig) -> Router {
    let scheduler = Arc::new(Scheduler::new(SchedulerConfig::default()));
    let election = Arc::new(Election::new(ElectionConfig { enabled: false, ..ElectionConfig::default() }));
    let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig { enabled: false, ..DispatcherConfig::default() }));
    Router::new(routes, RouterConfig::default(), scheduler, election, dispatcher)
}

#[tokio::test]
async fn failover_skips_a_failing_adapter() {
    let routes = RoutesConfig {
        default: vec!["bad".to_string(), "good".to_string()],
        ..RoutesConfig::default()
    };
    let router = test_router(routes);

    router.register_adapter(Arc::new(FailingAdapter::new("bad", "upstream exploded")));
    router.register_adapter(Arc::new(DelayedAdapter::new("good", fixed_response("all good"), std::time::Duration::ZERO)));

    let ctx = RequestContext::default();
    let req = user_request("m1", "hello", 64);
    let response = router.complete(&ctx, &req).await.expect("good adapter should answer after bad fails");

    assert_eq!(response.trace.provider, "good");
    assert!(response.trace.fallback_used, "second-position adapter must report fallback_used");
}

#[tokio::test]
async fn model_route_override_wins_over_default() {
    let mut routes = RoutesConfig {
        default: vec!["a1".to_string()],
        ..RoutesConfig::default()
    };
    routes.routes.insert("model/a".to_string(), vec!["a2".to_string()]);
    let router = test_router(routes);

    router.register_adapter(Arc::new(DelayedAdapter::new("a1", fixed_response("from a1"), std::time::Duration::ZERO)));
    router.register_adapter(Arc::new(DelayedAdapter::new("a2", fixed_response("from a2"), std::time::Duration::ZERO)));

    let ctx = RequestContext::default();
    let req = user_request("model/a", "hi", 64);
    let response = router.complete(&ctx, &req).await.expect("a2 should answer for the overridden model route");

    assert_eq!(response.trace.provider, "a2");
    assert_eq!(response.trace.selected_by, SelectedBy::Single);
}
