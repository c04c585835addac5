//! # Prosumer Peers
//!
//! Two prosumers wired to each other so each can call the other.

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use shared_bus::Context;
    use shared_types::{NodeConfig, RemoteError};
    use weft_request::{Prosumer, RequestError, Responder, NEW_LISTENER};

    fn peers(ctx: &Context, name: &str) -> (Prosumer, Prosumer) {
        let left = Prosumer::new(ctx, NodeConfig::default()).unwrap();
        let right = Prosumer::new(ctx, NodeConfig::default()).unwrap();
        left.listen_for_consumers(format!("inproc://{name}-left")).unwrap();
        right.listen_for_consumers(format!("inproc://{name}-right")).unwrap();
        left.connect_to_service(format!("inproc://{name}-right")).unwrap();
        right.connect_to_service(format!("inproc://{name}-left")).unwrap();
        (left, right)
    }

    #[tokio::test]
    async fn test_each_side_serves_the_other() {
        let ctx = Context::new();
        let (left, right) = peers(&ctx, "px-both");
        left.on("double", |v: Value, r: Responder| {
            r.ok(json!(v.as_i64().unwrap_or_default() * 2));
        });
        right.on("negate", |v: Value, r: Responder| {
            r.ok(json!(-v.as_i64().unwrap_or_default()));
        });

        assert_eq!(right.emit("double", &json!(21)).await.unwrap(), json!(42));
        assert_eq!(left.emit("negate", &json!(7)).await.unwrap(), json!(-7));
    }

    #[tokio::test]
    async fn test_local_capability_skips_the_network() {
        let ctx = Context::new();
        // Not connected to anything.
        let lonely = Prosumer::new(&ctx, NodeConfig::default()).unwrap();
        lonely.on_async("greet", |v: Value| async move {
            Ok(json!(format!("hi {}", v.as_str().unwrap_or("?"))))
        });
        lonely.on("fail", |_: Value, r: Responder| r.err(RemoteError::new("nope")));

        assert_eq!(lonely.emit("greet", &json!("ann")).await.unwrap(), json!("hi ann"));
        let err = lonely.emit("fail", &Value::Null).await.unwrap_err();
        assert_eq!(err.to_string(), "Error: nope");
        assert_eq!(lonely.emitter().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_reserved_name_resolves_locally() {
        let ctx = Context::new();
        let (left, _right) = peers(&ctx, "px-reserved");

        let err = left.emit(NEW_LISTENER, &Value::Null).await.unwrap_err();
        assert!(matches!(err, RequestError::NoSuchEvent { .. }));
        assert!(err.is_no_such_event());
    }

    #[tokio::test]
    async fn test_unknown_remote_event() {
        let ctx = Context::new();
        let (left, _right) = peers(&ctx, "px-unknown");

        let err = left.emit("nothing", &Value::Null).await.unwrap_err();
        assert!(err.is_no_such_event());
        assert!(matches!(err, RequestError::Remote(_)));
    }

    #[tokio::test]
    async fn test_off_hands_the_name_to_the_peer() {
        let ctx = Context::new();
        let (left, right) = peers(&ctx, "px-off");
        left.on("where", |_: Value, r: Responder| r.ok(json!("left")));
        right.on("where", |_: Value, r: Responder| r.ok(json!("right")));

        assert_eq!(left.emit("where", &Value::Null).await.unwrap(), json!("left"));
        assert!(left.off("where"));
        assert_eq!(left.emit("where", &Value::Null).await.unwrap(), json!("right"));
    }
}
