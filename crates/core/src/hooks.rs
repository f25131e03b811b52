//! Lifecycle hook registry: named points in the request path where
//! operator-registered handlers can observe or short-circuit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::request_context::RequestContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    BeforeRoute,
    AfterAdapterCall,
    BeforeResponse,
}

#[async_trait]
pub trait Hook: Send + Sync {
    fn name(&self) -> &str;
    fn priority(&self) -> i32;
    async fn call(&self, ctx: &RequestContext, data: Value) -> Result<Option<Value>>;
}

struct Registration {
    hook: Arc<dyn Hook>,
    registration_order: usize,
}

pub struct HooksRegistry {
    points: RwLock<HashMap<HookPoint, Vec<Registration>>>,
    next_order: AtomicUsize,
}

impl Default for HooksRegistry {
    fn default() -> Self {
        Self {
            points: RwLock::new(HashMap::new()),
            next_order: AtomicUsize::new(0),
        }
    }
}

impl HooksRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` at `point`. Handlers at a point are kept sorted
    /// by descending priority, ties broken by registration order.
    pub fn register(&self, point: HookPoint, hook: Arc<dyn Hook>) {
        let order = self.next_order.fetch_add(1, Ordering::Relaxed);
        let mut points = self.points.write().unwrap();
        let handlers = points.entry(point).or_default();
        handlers.push(Registration {
            hook,
            registration_order: order,
        });
        handlers.sort_by(|a, b| b.hook.priority().cmp(&a.hook.priority()).then(a.registration_order.cmp(&b.registration_order)));
    }

    /// Fire every handler at `point` in priority order. Each handler
    /// sees the data produced by the previous one; a handler error
    /// aborts the chain.
    pub async fn fire(&self, point: HookPoint, ctx: &RequestContext, mut data: Value) -> Result<Value> {
        let handlers: Vec<Arc<dyn Hook>> = {
            let points = self.points.read().unwrap();
            points.get(&point).map(|hs| hs.iter().map(|r| r.hook.clone()).collect()).unwrap_or_default()
        };

        for hook in handlers {
            match hook.call(ctx, data.clone()).await {
                Ok(Some(next)) => data = next,
                Ok(None) => {}
                Err(err) => {
                    return Err(GatewayError::HookAborted {
                        name: hook.name().to_string(),
                        message: err.message(),
                    });
                }
            }
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Reject(&'static str, i32);

    #[async_trait]
    impl Hook for Reject {
        fn name(&self) -> &str {
            self.0
        }
        fn priority(&self) -> i32 {
            self.1
        }
        async fn call(&self, _ctx: &RequestContext, _data: Value) -> Result<Option<Value>> {
            Err(GatewayError::Configuration("rejected".to_string()))
        }
    }

    struct Passthrough(&'static str, i32);

    #[async_trait]
    impl Hook for Passthrough {
        fn name(&self) -> &str {
            self.0
        }
        fn priority(&self) -> i32 {
            self.1
        }
        async fn call(&self, _ctx: &RequestContext, data: Value) -> Result<Option<Value>> {
            Ok(Some(data))
        }
    }

    #[tokio::test]
    async fn higher_priority_runs_first_and_abort_stops_chain() {
        let registry = HooksRegistry::new();
        registry.register(HookPoint::BeforeRoute, Arc::new(Passthrough("low", 1)));
        registry.register(HookPoint::BeforeRoute, Arc::new(Reject("high", 10)));

        let result = registry.fire(HookPoint::BeforeRoute, &RequestContext::default(), Value::Null).await;
        assert!(result.is_err(), "the higher-priority hook should run and abort the chain");
    }

    #[tokio::test]
    async fn empty_point_passes_data_through_unchanged() {
        let registry = HooksRegistry::new();
        let data = serde_json::json!({ "k": "v" });
        let result = registry.fire(HookPoint::AfterAdapterCall, &RequestContext::default(), data.clone()).await.unwrap();
        assert_eq!(result, data);
    }
}
