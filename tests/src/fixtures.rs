//! Node builders shared by the integration scenarios and the benchmarks.

use parking_lot::Mutex;
use serde_json::{json, Value};
use shared_bus::Context;
use shared_types::NodeConfig;
use std::sync::Arc;
use std::time::Duration;
use weft_request::{RequestEmitter, RequestHandler, Responder};

/// What a recording handler saw: event name, correlation id, payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Seen {
    pub name: String,
    pub id: String,
    pub payload: Value,
}

pub type SeenLog = Arc<Mutex<Vec<Seen>>>;

fn record(log: &SeenLog, payload: &Value, responder: &Responder) {
    log.lock().push(Seen {
        name: responder.event().to_owned(),
        id: responder.id().to_string(),
        payload: payload.clone(),
    });
}

/// Handler that records every call to `names` and replies `{ok: true}`.
pub fn recording_handler(ctx: &Context, names: &[&str]) -> (RequestHandler, SeenLog) {
    let handler = RequestHandler::new(ctx, NodeConfig::default()).expect("handler");
    let log = SeenLog::default();
    for name in names {
        let log = log.clone();
        handler.on(*name, move |payload: Value, responder: Responder| {
            record(&log, &payload, &responder);
            responder.ok(json!({"ok": true}));
        });
    }
    (handler, log)
}

/// Handler that records calls to `name` and never answers.
pub fn silent_handler(ctx: &Context, name: &str) -> (RequestHandler, SeenLog) {
    let handler = RequestHandler::new(ctx, NodeConfig::default()).expect("handler");
    let log = SeenLog::default();
    let seen = log.clone();
    handler.on(name, move |payload: Value, responder: Responder| {
        record(&seen, &payload, &responder);
        // Dropped unanswered.
    });
    (handler, log)
}

/// Handler whose `echo` capability replies with the payload.
pub fn echo_handler(ctx: &Context) -> RequestHandler {
    let handler = RequestHandler::new(ctx, NodeConfig::default()).expect("handler");
    handler.on("echo", |payload: Value, responder: Responder| responder.ok(payload));
    handler
}

pub fn emitter_to(ctx: &Context, url: &str, config: NodeConfig) -> RequestEmitter {
    let emitter = RequestEmitter::new(ctx, config).expect("emitter");
    emitter.connect(url).expect("connect");
    emitter
}

/// Give background pumps and broadcasts a moment to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
