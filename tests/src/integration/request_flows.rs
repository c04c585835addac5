//! # Request/Response Flows
//!
//! One emitter, one handler, connected directly over inproc.

#[cfg(test)]
mod tests {
    use crate::fixtures::{emitter_to, eventually, recording_handler, settle, silent_handler};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use shared_bus::Context;
    use shared_types::{Fault, NodeConfig, RemoteError};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::task::JoinSet;
    use weft_request::{RequestError, RequestHandler, Responder};

    // =========================================================================
    // ROUND TRIPS
    // =========================================================================

    #[tokio::test]
    async fn test_answer_reaches_handler_and_result_returns() {
        let ctx = Context::new();
        let (handler, seen) = recording_handler(&ctx, &["test"]);
        handler.listen("inproc://rf-answer").unwrap();
        let emitter = emitter_to(&ctx, "inproc://rf-answer", NodeConfig::default());

        let (tx, rx) = oneshot::channel();
        emitter.send("test", &json!({"answer": 42}), Some(tx), 0);
        let result = rx.await.unwrap().unwrap();

        assert_eq!(result, json!({"ok": true}));
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].name, "test");
        assert_eq!(seen[0].payload, json!({"answer": 42}));
        assert_eq!(emitter.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unregistered_event_leaves_capabilities_alone() {
        let ctx = Context::new();
        let (handler, seen) = recording_handler(&ctx, &["test"]);
        handler.listen("inproc://rf-missing").unwrap();
        let emitter = emitter_to(&ctx, "inproc://rf-missing", NodeConfig::default());

        let err = emitter.request("missing", &Value::Null).await.unwrap_err();

        assert!(err.is_no_such_event());
        assert_eq!(err.to_string(), "Error: No such event");
        assert_eq!(handler.names(), vec!["test".to_owned()]);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_notify_leaves_no_pending_entry() {
        let ctx = Context::new();
        let (handler, seen) = recording_handler(&ctx, &["test"]);
        handler.listen("inproc://rf-notify").unwrap();
        let emitter = emitter_to(&ctx, "inproc://rf-notify", NodeConfig::default());

        emitter.notify("test", &json!("fire")).unwrap();
        assert_eq!(emitter.pending_count(), 0);
        assert!(eventually(|| seen.lock().len() == 1).await);
        assert_eq!(seen.lock()[0].payload, json!("fire"));
    }

    #[tokio::test]
    async fn test_outstanding_ids_are_distinct() {
        const CALLS: usize = 50;
        let ctx = Context::new();
        let handler = RequestHandler::new(&ctx, NodeConfig::default()).unwrap();
        let held: Arc<Mutex<Vec<Responder>>> = Arc::default();
        let parked = held.clone();
        handler.on("hold", move |_: Value, r: Responder| parked.lock().push(r));
        handler.listen("inproc://rf-ids").unwrap();
        let emitter = emitter_to(&ctx, "inproc://rf-ids", NodeConfig::default());

        let mut calls = JoinSet::new();
        for i in 0..CALLS {
            let emitter = emitter.clone();
            calls.spawn(async move { emitter.request("hold", &json!(i)).await });
        }
        assert!(eventually(|| held.lock().len() == CALLS).await);

        let responders: Vec<Responder> = std::mem::take(&mut *held.lock());
        let ids: HashSet<String> = responders.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids.len(), CALLS);
        assert_eq!(emitter.pending_count(), CALLS);

        for responder in responders {
            responder.ok(json!("done"));
        }
        while let Some(joined) = calls.join_next().await {
            assert_eq!(joined.unwrap().unwrap(), json!("done"));
        }
        assert_eq!(emitter.pending_count(), 0);
    }

    // =========================================================================
    // ERRORS
    // =========================================================================

    #[tokio::test]
    async fn test_remote_error_is_sanitized_without_stack() {
        let ctx = Context::new();
        let handler = RequestHandler::new(&ctx, NodeConfig::default()).unwrap();
        handler.on("fail", |_: Value, r: Responder| {
            r.err(
                RemoteError::named("TypeError", "bad input")
                    .with_code("EBAD")
                    .with_stack("at fail"),
            );
        });
        handler.listen("inproc://rf-fail").unwrap();
        let emitter = emitter_to(&ctx, "inproc://rf-fail", NodeConfig::default());

        let err = emitter.request("fail", &Value::Null).await.unwrap_err();
        let RequestError::Remote(Fault::Error(remote)) = err else {
            panic!("expected a remote error, got {err:?}");
        };
        assert_eq!(remote.name, "TypeError");
        assert_eq!(remote.message, "bad input");
        assert_eq!(remote.code.as_deref(), Some("EBAD"));
        assert_eq!(remote.stack, None);
    }

    #[tokio::test]
    async fn test_stack_crosses_when_exposed() {
        let ctx = Context::new();
        let config = NodeConfig::default().with_expose_stack(true);
        let handler = RequestHandler::new(&ctx, config).unwrap();
        handler.on("fail", |_: Value, r: Responder| {
            r.err(RemoteError::new("boom").with_stack("at fail"));
        });
        handler.listen("inproc://rf-stack").unwrap();
        let emitter = emitter_to(&ctx, "inproc://rf-stack", NodeConfig::default());

        let err = emitter.request("fail", &Value::Null).await.unwrap_err();
        let RequestError::Remote(Fault::Error(remote)) = err else {
            panic!("expected a remote error, got {err:?}");
        };
        assert_eq!(remote.stack.as_deref(), Some("at fail"));
    }

    // =========================================================================
    // TIMEOUTS AND ADMISSION
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_once_after_every_attempt() {
        let ctx = Context::new();
        let (handler, seen) = silent_handler(&ctx, "test");
        handler.listen("inproc://rf-timeout").unwrap();
        let config = NodeConfig::default()
            .with_timeout(Duration::from_millis(100))
            .with_retries(2);
        let emitter = emitter_to(&ctx, "inproc://rf-timeout", config);

        let started = tokio::time::Instant::now();
        let err = emitter.request("test", &Value::Null).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(err.is_timeout());
        assert_eq!(err.code(), Some("ETIMEDOUT"));
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(400));

        // One write per attempt, each under a fresh id.
        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        let ids: HashSet<&str> = seen.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(emitter.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_admission_failure_never_reaches_the_wire() {
        let ctx = Context::new();
        let (handler, seen) = silent_handler(&ctx, "test");
        handler.listen("inproc://rf-admit").unwrap();
        let config = NodeConfig::default().with_max_pending(1);
        let emitter = emitter_to(&ctx, "inproc://rf-admit", config);

        let (held_tx, _held_rx) = oneshot::channel();
        emitter.send("test", &json!(1), Some(held_tx), 0);
        let err = emitter.request("test", &json!(2)).await.unwrap_err();

        assert!(matches!(err, RequestError::TooManyRequests));
        assert_eq!(err.code(), Some("ETOOMANY"));
        settle().await;
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].payload, json!(1));
    }
}
