//! # Synchronization Flows
//!
//! A sync handler holding state, emitters reading through their caches.

#[cfg(test)]
mod tests {
    use crate::fixtures::settle;
    use serde_json::{json, Value};
    use shared_bus::Context;
    use shared_types::{Encoding, NodeConfig};
    use std::sync::atomic::Ordering;
    use weft_router::Bridge;
    use weft_sync::{SyncEmitter, SyncHandler};

    fn handler(ctx: &Context, name: &str, config: NodeConfig) -> SyncHandler {
        let handler = SyncHandler::new(ctx, config).unwrap();
        handler.listen_for_requests(format!("inproc://{name}-req")).unwrap();
        handler.listen_for_broadcasts(format!("inproc://{name}-pub")).unwrap();
        handler
    }

    fn emitter(ctx: &Context, name: &str, config: NodeConfig) -> SyncEmitter {
        let emitter = SyncEmitter::new(ctx, config).unwrap();
        emitter.connect_for_requests(format!("inproc://{name}-req")).unwrap();
        emitter.connect_for_broadcasts(format!("inproc://{name}-pub")).unwrap();
        emitter
    }

    #[tokio::test]
    async fn test_second_get_is_served_from_cache() {
        let ctx = Context::new();
        let handler = handler(&ctx, "sf-cache", NodeConfig::default());
        let emitter = emitter(&ctx, "sf-cache", NodeConfig::default());

        assert_eq!(emitter.get("answer").await.unwrap(), Value::Null);
        emitter.set("answer", json!(42)).await.unwrap();
        settle().await;

        let registered = || emitter.emitter().stats().total_registered.load(Ordering::Relaxed);
        let before = registered();
        assert_eq!(emitter.get("answer").await.unwrap(), json!(42));
        assert_eq!(registered(), before);
        assert_eq!(handler.value("answer"), Some(json!(42)));
    }

    #[tokio::test]
    async fn test_updates_reach_every_emitter() {
        let ctx = Context::new();
        let _handler = handler(&ctx, "sf-fan", NodeConfig::default());
        let writer = emitter(&ctx, "sf-fan", NodeConfig::default());
        let reader = emitter(&ctx, "sf-fan", NodeConfig::default());

        writer.set("color", json!("green")).await.unwrap();
        settle().await;

        assert_eq!(reader.cached("color"), Some(json!("green")));
        assert_eq!(reader.get("color").await.unwrap(), json!("green"));
    }

    #[tokio::test]
    async fn test_msgpack_nodes_sync() {
        let ctx = Context::new();
        let config = NodeConfig::default().with_encoding(Encoding::MsgPack);
        let _handler = handler(&ctx, "sf-mp", config.clone());
        let emitter = emitter(&ctx, "sf-mp", config);

        let record = json!({"name": "weft", "tags": ["a", "b"], "size": 3});
        emitter.set("record", record.clone()).await.unwrap();
        settle().await;
        assert_eq!(emitter.cached("record"), Some(record));
    }

    #[tokio::test]
    async fn test_sync_behind_a_bridge() {
        let ctx = Context::new();
        let bridge = Bridge::new(&ctx, NodeConfig::default()).unwrap();
        bridge.listen_for_consumers("inproc://sf-br-front").unwrap();
        bridge.listen_for_services("inproc://sf-br-back").unwrap();

        let handler = SyncHandler::new(&ctx, NodeConfig::default()).unwrap();
        handler.connect_for_requests("inproc://sf-br-back").unwrap();

        let config = NodeConfig::default().with_auto_update(false);
        let emitter = SyncEmitter::new(&ctx, config).unwrap();
        emitter.connect_for_requests("inproc://sf-br-front").unwrap();

        emitter.set("hops", json!(false)).await.unwrap();
        assert_eq!(emitter.get("hops").await.unwrap(), json!(false));
        assert!(emitter.cached("hops").is_none());
    }
}
