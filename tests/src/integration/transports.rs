//! # Stream Transports and Runtime Roles
//!
//! The same flows over tcp and ipc, and nodes started through the runtime.

#[cfg(test)]
mod tests {
    use crate::fixtures::{echo_handler, emitter_to};
    use node_runtime::{HostedNode, NodeRuntime, Role, RuntimeConfig};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use shared_bus::Context;
    use shared_types::NodeConfig;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;
    use weft_broadcast::{Publisher, Subscriber};

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_request_over_tcp() {
        let ctx = Context::new();
        let handler = echo_handler(&ctx);
        handler.listen("tcp://127.0.0.1:0").unwrap();
        let url = handler.last_endpoint().unwrap();
        let emitter = emitter_to(&ctx, &url, NodeConfig::default());

        let payload = json!({"nested": {"list": [1, 2, 3]}, "text": "über"});
        let result = timeout(WAIT, emitter.request("echo", &payload))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, payload);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_request_over_ipc_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echo.sock").display().to_string();
        let ctx = Context::new();
        let handler = echo_handler(&ctx);
        handler.listen(path.as_str()).unwrap();
        let emitter = emitter_to(&ctx, &format!("ipc://{path}"), NodeConfig::default());

        let result = timeout(WAIT, emitter.request("echo", &json!("via ipc")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, json!("via ipc"));
    }

    #[tokio::test]
    async fn test_broadcast_over_tcp() {
        let ctx = Context::new();
        let publisher = Publisher::new(&ctx, NodeConfig::default()).unwrap();
        publisher.listen("tcp://127.0.0.1:0").unwrap();
        let url = publisher.last_endpoint().unwrap();

        let subscriber = Subscriber::new(&ctx, NodeConfig::default()).unwrap();
        let received: Arc<Mutex<Vec<Value>>> = Arc::default();
        let sink = received.clone();
        subscriber.on("tick", move |v| sink.lock().push(v)).unwrap();
        subscriber.connect(url.as_str()).unwrap();

        // The subscriber attaches asynchronously; publish until one lands.
        timeout(WAIT, async {
            loop {
                publisher.publish("tick", &json!(1));
                tokio::time::sleep(Duration::from_millis(10)).await;
                if !received.lock().is_empty() {
                    break;
                }
            }
        })
        .await
        .unwrap();
        assert!(received.lock().iter().all(|v| *v == json!(1)));
    }

    #[tokio::test]
    async fn test_runtime_bridge_with_echo_service() {
        let mut bridge = RuntimeConfig::new(Role::Bridge);
        bridge.front_url = Some("tcp://127.0.0.1:0".into());
        bridge.back_url = Some("inproc://tr-back".into());
        let runtime = NodeRuntime::start(&bridge).unwrap();
        let HostedNode::Bridge(node) = runtime.node() else {
            panic!("expected the bridge role");
        };
        let front = node.last_endpoint().unwrap();

        let mut echo = RuntimeConfig::new(Role::Echo);
        echo.connect_url = Some("inproc://tr-back".into());
        let service = HostedNode::start(runtime.context(), &echo).unwrap();

        let emitter = emitter_to(runtime.context(), &front, NodeConfig::default());
        let result = timeout(WAIT, emitter.request("echo", &json!([true, null])))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, json!([true, null]));

        let err = emitter.request("broken", &Value::Null).await.unwrap_err();
        assert_eq!(err.to_string(), "Error: Broken");

        service.close();
        runtime.shutdown();
    }
}
