//! Observability callbacks fired by the executor.
//!
//! Hooks are synchronous and infallible. They run inline on the request path,
//! so implementations should hand anything slow off to another task.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::Level;

use crate::error::BasecampError;
use crate::operation::{OperationDescriptor, OperationResult, RequestInfo, RequestResult};

/// Lifecycle callbacks. Every method defaults to a no-op.
pub trait Hooks: Send + Sync {
    /// Once per logical call, before anything else.
    fn on_operation_start(&self, _op: &OperationDescriptor) {}

    /// Once per logical call, with the final outcome.
    fn on_operation_end(&self, _op: &OperationDescriptor, _result: &OperationResult<'_>) {}

    /// Before each physical attempt.
    fn on_request_start(&self, _info: &RequestInfo) {}

    /// After each physical attempt, including ones that will be retried.
    fn on_request_end(&self, _info: &RequestInfo, _result: &RequestResult<'_>) {}

    /// Before sleeping ahead of attempt `next_attempt`.
    fn on_retry(
        &self,
        _info: &RequestInfo,
        _next_attempt: u32,
        _error: &BasecampError,
        _delay: Duration,
    ) {
    }
}

/// Hooks that do nothing. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl Hooks for NoopHooks {}

/// Fans every event out to several hooks.
///
/// Start events run in registration order, end events in reverse so nested
/// instrumentation (spans, timers) unwinds correctly.
#[derive(Clone, Default)]
pub struct ChainHooks {
    hooks: Vec<Arc<dyn Hooks>>,
}

impl fmt::Debug for ChainHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainHooks")
            .field("len", &self.hooks.len())
            .finish()
    }
}

impl ChainHooks {
    pub fn new(hooks: Vec<Arc<dyn Hooks>>) -> Self {
        Self { hooks }
    }

    #[must_use]
    pub fn with(mut self, hook: Arc<dyn Hooks>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl Hooks for ChainHooks {
    fn on_operation_start(&self, op: &OperationDescriptor) {
        for hook in &self.hooks {
            hook.on_operation_start(op);
        }
    }

    fn on_operation_end(&self, op: &OperationDescriptor, result: &OperationResult<'_>) {
        for hook in self.hooks.iter().rev() {
            hook.on_operation_end(op, result);
        }
    }

    fn on_request_start(&self, info: &RequestInfo) {
        for hook in &self.hooks {
            hook.on_request_start(info);
        }
    }

    fn on_request_end(&self, info: &RequestInfo, result: &RequestResult<'_>) {
        for hook in self.hooks.iter().rev() {
            hook.on_request_end(info, result);
        }
    }

    fn on_retry(&self, info: &RequestInfo, next_attempt: u32, error: &BasecampError, delay: Duration) {
        for hook in &self.hooks {
            hook.on_retry(info, next_attempt, error, delay);
        }
    }
}

macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {
        if $level == Level::ERROR {
            tracing::error!($($arg)+)
        } else if $level == Level::WARN {
            tracing::warn!($($arg)+)
        } else if $level == Level::INFO {
            tracing::info!($($arg)+)
        } else if $level == Level::DEBUG {
            tracing::debug!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    };
}

/// Emits structured `tracing` events for every lifecycle callback.
///
/// Successful events go out at the configured level; failures and retries
/// always go out at `WARN`. URLs are logged without query strings.
#[derive(Debug, Clone, Copy)]
pub struct TracingHooks {
    level: Level,
}

impl Default for TracingHooks {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl TracingHooks {
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

fn log_url(info: &RequestInfo) -> String {
    let mut url = info.url.clone();
    url.set_query(None);
    url.to_string()
}

impl Hooks for TracingHooks {
    fn on_operation_start(&self, op: &OperationDescriptor) {
        event_at!(
            self.level,
            operation = %op.name(),
            resource_type = %op.resource_type,
            is_mutation = op.is_mutation,
            "operation started"
        );
    }

    fn on_operation_end(&self, op: &OperationDescriptor, result: &OperationResult<'_>) {
        let duration_ms = result.duration.as_millis() as u64;
        match result.error {
            Some(err) => tracing::warn!(
                operation = %op.name(),
                duration_ms,
                error_kind = %err.kind(),
                error = %err,
                "operation failed"
            ),
            None => event_at!(
                self.level,
                operation = %op.name(),
                duration_ms,
                "operation completed"
            ),
        }
    }

    fn on_request_start(&self, info: &RequestInfo) {
        event_at!(
            self.level,
            method = %info.method,
            url = %log_url(info),
            attempt = info.attempt,
            "request started"
        );
    }

    fn on_request_end(&self, info: &RequestInfo, result: &RequestResult<'_>) {
        let duration_ms = result.duration.as_millis() as u64;
        match result.error {
            Some(err) => tracing::warn!(
                method = %info.method,
                url = %log_url(info),
                attempt = info.attempt,
                status = result.status,
                duration_ms,
                will_retry = result.will_retry,
                error = %err,
                "request failed"
            ),
            None => event_at!(
                self.level,
                method = %info.method,
                url = %log_url(info),
                attempt = info.attempt,
                status = result.status,
                duration_ms,
                bytes = result.bytes,
                from_cache = result.from_cache,
                "request completed"
            ),
        }
    }

    fn on_retry(&self, info: &RequestInfo, next_attempt: u32, error: &BasecampError, delay: Duration) {
        tracing::warn!(
            method = %info.method,
            url = %log_url(info),
            attempt = next_attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retrying request"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use reqwest::Method;
    use url::Url;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Hooks for Recorder {
        fn on_operation_start(&self, op: &OperationDescriptor) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:start:{}", self.name, op.name()));
        }

        fn on_operation_end(&self, op: &OperationDescriptor, _result: &OperationResult<'_>) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:end:{}", self.name, op.name()));
        }

        fn on_request_start(&self, info: &RequestInfo) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:req:{}", self.name, info.attempt));
        }

        fn on_request_end(&self, info: &RequestInfo, _result: &RequestResult<'_>) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:res:{}", self.name, info.attempt));
        }
    }

    fn request_info() -> RequestInfo {
        RequestInfo {
            method: Method::GET,
            url: Url::parse("https://3.basecampapi.com/1/projects.json?page=2").unwrap(),
            attempt: 1,
        }
    }

    #[test]
    fn test_chain_orders_start_forward_and_end_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = ChainHooks::default()
            .with(Arc::new(Recorder {
                name: "a",
                log: log.clone(),
            }))
            .with(Arc::new(Recorder {
                name: "b",
                log: log.clone(),
            }));
        assert_eq!(chain.len(), 2);

        let op = OperationDescriptor::new("Projects", "List", Method::GET);
        let info = request_info();
        chain.on_operation_start(&op);
        chain.on_request_start(&info);
        chain.on_request_end(&info, &RequestResult::default());
        chain.on_operation_end(&op, &OperationResult::default());

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a:start:Projects.List",
                "b:start:Projects.List",
                "a:req:1",
                "b:req:1",
                "b:res:1",
                "a:res:1",
                "b:end:Projects.List",
                "a:end:Projects.List",
            ]
        );
    }

    #[test]
    fn test_noop_and_tracing_hooks_accept_all_events() {
        let op = OperationDescriptor::new("Projects", "Get", Method::GET);
        let info = request_info();
        let err = BasecampError::network("reset");

        for hooks in [
            Arc::new(NoopHooks) as Arc<dyn Hooks>,
            Arc::new(TracingHooks::new(Level::INFO)),
        ] {
            hooks.on_operation_start(&op);
            hooks.on_request_start(&info);
            hooks.on_request_end(
                &info,
                &RequestResult {
                    error: Some(&err),
                    will_retry: true,
                    ..Default::default()
                },
            );
            hooks.on_retry(&info, 2, &err, Duration::from_millis(10));
            hooks.on_operation_end(&op, &OperationResult::default());
        }
    }

    #[test]
    fn test_log_url_strips_query() {
        assert_eq!(
            log_url(&request_info()),
            "https://3.basecampapi.com/1/projects.json"
        );
    }
}
