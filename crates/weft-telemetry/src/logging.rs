//! Structured log macros.
//!
//! Every line carries a `node` field naming the role that emitted it, so logs
//! from several roles hosted in one process can be told apart.

/// Log with a `node` field.
///
/// ```rust,ignore
/// log_event!(info, "router", "forwarded", service = "svc", id = %id);
/// ```
#[macro_export]
macro_rules! log_event {
    (info, $node:expr, $msg:expr $(, $($field:tt)*)?) => {
        ::tracing::info!(
            node = $node,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $node:expr, $msg:expr $(, $($field:tt)*)?) => {
        ::tracing::warn!(
            node = $node,
            $($($field)*,)?
            $msg
        )
    };

    (error, $node:expr, $msg:expr $(, $($field:tt)*)?) => {
        ::tracing::error!(
            node = $node,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $node:expr, $msg:expr $(, $($field:tt)*)?) => {
        ::tracing::debug!(
            node = $node,
            $($($field)*,)?
            $msg
        )
    };
}
