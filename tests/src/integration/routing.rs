//! # Routing Topologies
//!
//! Emitters in front of routers and bridges, handlers behind them.

#[cfg(test)]
mod tests {
    use crate::fixtures::{echo_handler, emitter_to, recording_handler};
    use serde_json::{json, Value};
    use shared_bus::Context;
    use shared_types::NodeConfig;
    use weft_router::{Bridge, RelayEvent, Router, RouterConfig};

    fn router(ctx: &Context, front: &str) -> Router {
        let router = Router::new(ctx, RouterConfig::default()).unwrap();
        router.listen_for_consumers(front).unwrap();
        router
    }

    // =========================================================================
    // ROUTER
    // =========================================================================

    #[tokio::test]
    async fn test_service_prefix_is_stripped_before_the_backend() {
        let ctx = Context::new();
        let router = router(&ctx, "inproc://rt-ping-front");
        router.listen_for_services("svc", "inproc://rt-ping-svc").unwrap();
        let (backend, seen) = recording_handler(&ctx, &["ping"]);
        backend.connect("inproc://rt-ping-svc").unwrap();
        let emitter = emitter_to(&ctx, "inproc://rt-ping-front", NodeConfig::default());

        let result = emitter.request("svc::ping", &json!("hello")).await.unwrap();

        assert_eq!(result, json!({"ok": true}));
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].name, "ping");
        assert_eq!(seen[0].payload, json!("hello"));
    }

    #[tokio::test]
    async fn test_round_robin_spreads_requests() {
        const REQUESTS: usize = 10;
        let ctx = Context::new();
        let router = router(&ctx, "inproc://rt-rr-front");
        router.listen_for_services("svc", "inproc://rt-rr-svc").unwrap();
        let (first, first_seen) = recording_handler(&ctx, &["work"]);
        let (second, second_seen) = recording_handler(&ctx, &["work"]);
        first.connect("inproc://rt-rr-svc").unwrap();
        second.connect("inproc://rt-rr-svc").unwrap();
        let emitter = emitter_to(&ctx, "inproc://rt-rr-front", NodeConfig::default());

        for i in 0..REQUESTS {
            emitter.request("svc::work", &json!(i)).await.unwrap();
        }

        let (a, b) = (first_seen.lock().len(), second_seen.lock().len());
        assert_eq!(a + b, REQUESTS);
        assert!(a > 0 && b > 0, "one backend took every request: {a}/{b}");
    }

    #[tokio::test]
    async fn test_unserved_service_reports_write_refusal() {
        let ctx = Context::new();
        let router = router(&ctx, "inproc://rt-none-front");
        let emitter = emitter_to(&ctx, "inproc://rt-none-front", NodeConfig::default());

        let err = emitter.request("nobody::ping", &Value::Null).await.unwrap_err();

        assert_eq!(err.code(), Some("EWRITE"));
        assert_eq!(router.pending_count(), 0);
        assert!(router.services().contains(&"nobody".to_owned()));
    }

    #[tokio::test]
    async fn test_relay_events_follow_each_request() {
        let ctx = Context::new();
        let router = router(&ctx, "inproc://rt-ev-front");
        router.listen_for_services("svc", "inproc://rt-ev-svc").unwrap();
        let backend = echo_handler(&ctx);
        backend.connect("inproc://rt-ev-svc").unwrap();
        let mut events = router.events();
        let emitter = emitter_to(&ctx, "inproc://rt-ev-front", NodeConfig::default());

        emitter.request("svc::echo", &json!(1)).await.unwrap();

        let RelayEvent::Forwarded { internal_id, service, name } = events.recv().await.unwrap()
        else {
            panic!("expected a forward first");
        };
        assert_eq!((service.as_str(), name.as_str()), ("svc", "echo"));
        let RelayEvent::Returned { internal_id: returned, .. } = events.recv().await.unwrap()
        else {
            panic!("expected the return second");
        };
        assert_eq!(returned, internal_id);
    }

    // =========================================================================
    // BRIDGE AND CHAINS
    // =========================================================================

    #[tokio::test]
    async fn test_bridge_keeps_event_names() {
        let ctx = Context::new();
        let bridge = Bridge::new(&ctx, NodeConfig::default()).unwrap();
        bridge.listen_for_consumers("inproc://br-front").unwrap();
        bridge.listen_for_services("inproc://br-back").unwrap();
        let (backend, seen) = recording_handler(&ctx, &["svc::ping"]);
        backend.connect("inproc://br-back").unwrap();
        let emitter = emitter_to(&ctx, "inproc://br-front", NodeConfig::default());

        emitter.request("svc::ping", &Value::Null).await.unwrap();

        assert_eq!(seen.lock()[0].name, "svc::ping");
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_router_in_front_of_bridge() {
        let ctx = Context::new();
        let router = router(&ctx, "inproc://chain-front");
        router.listen_for_services("svc", "inproc://chain-mid").unwrap();

        let bridge = Bridge::new(&ctx, NodeConfig::default()).unwrap();
        bridge.connect_to_consumer("inproc://chain-mid").unwrap();
        bridge.listen_for_services("inproc://chain-back").unwrap();
        let (backend, seen) = recording_handler(&ctx, &["ping"]);
        backend.connect("inproc://chain-back").unwrap();

        let emitter = emitter_to(&ctx, "inproc://chain-front", NodeConfig::default());
        let result = emitter.request("svc::ping", &json!({"hop": 2})).await.unwrap();

        assert_eq!(result, json!({"ok": true}));
        assert_eq!(seen.lock()[0].name, "ping");
        assert_eq!(router.pending_count(), 0);
        assert_eq!(bridge.pending_count(), 0);
    }
}
