//! Timeout-bound dispatch.
//!
//! # Responsibilities
//! - Run a handler on its own task
//! - Race its completion against the request deadline
//! - Return exactly one envelope: the handler's or the fixed timeout one
//!
//! # Design Decisions
//! - The handler is never aborted; on timeout the request's cancellation
//!   token is set so store calls stop cooperatively
//! - A result that arrives after the deadline is logged as orphaned and
//!   counted, never returned
//! - A panicking handler yields a 500 envelope

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::TimeoutConfig;
use crate::error::ServiceError;
use crate::http::request::RequestContext;
use crate::http::response::Envelope;
use crate::observability::metrics;
use crate::resources::ResourceKind;
use crate::routing::Operation;

/// Deadline per route: one default plus per-(resource, operation) overrides.
#[derive(Debug, Clone)]
pub struct TimeoutPolicy {
    default: Duration,
    overrides: HashMap<(ResourceKind, Operation), Duration>,
}

impl TimeoutPolicy {
    pub fn from_config(config: &TimeoutConfig) -> Self {
        let overrides = config
            .overrides
            .iter()
            .map(|o| ((o.resource, o.operation), Duration::from_millis(o.request_ms)))
            .collect();
        Self {
            default: Duration::from_millis(config.request_ms),
            overrides,
        }
    }

    pub fn timeout_for(&self, resource: ResourceKind, operation: Operation) -> Duration {
        self.overrides
            .get(&(resource, operation))
            .copied()
            .unwrap_or(self.default)
    }
}

/// Terminal state of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    TimedOut,
    Panicked,
}

/// Races handlers against their request deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher;

impl Dispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Run `handler` and return the single envelope for the request.
    pub async fn dispatch<F>(&self, ctx: &RequestContext, handler: F) -> Envelope
    where
        F: Future<Output = Envelope> + Send + 'static,
    {
        self.dispatch_with_outcome(ctx, handler).await.0
    }

    /// Like [`dispatch`](Self::dispatch), also reporting which path produced
    /// the envelope.
    pub async fn dispatch_with_outcome<F>(&self, ctx: &RequestContext, handler: F) -> (Envelope, Outcome)
    where
        F: Future<Output = Envelope> + Send + 'static,
    {
        let mut task = tokio::spawn(handler.in_current_span());
        let deadline = tokio::time::Instant::from_std(ctx.deadline());

        tokio::select! {
            joined = &mut task => match joined {
                Ok(envelope) => {
                    tracing::debug!(status = envelope.status.as_u16(), "Response received");
                    (envelope, Outcome::Completed)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Handler task failed");
                    let envelope: Envelope = ServiceError::Internal("Internal server error".into()).into();
                    (envelope, Outcome::Panicked)
                }
            },
            _ = tokio::time::sleep_until(deadline) => {
                ctx.cancel();
                let elapsed_ms = ctx.received_at().elapsed().as_millis() as u64;
                tracing::error!(elapsed_ms, "Request timed out");
                metrics::record_timeout(ctx.resource());
                let _ = watch_orphan(ctx.clone(), task);
                (Envelope::timeout(), Outcome::TimedOut)
            }
        }
    }
}

/// Observe a handler that outlived its deadline and log what it produced.
fn watch_orphan(ctx: RequestContext, task: JoinHandle<Envelope>) -> JoinHandle<Outcome> {
    tokio::spawn(
        async move {
            match task.await {
                Ok(envelope) => {
                    tracing::warn!(
                        status = envelope.status.as_u16(),
                        late_ms = ctx.deadline().elapsed().as_millis() as u64,
                        "Discarding handler result produced after the deadline"
                    );
                    metrics::record_orphaned(ctx.resource());
                    Outcome::Completed
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        late_ms = ctx.deadline().elapsed().as_millis() as u64,
                        "Handler failed after the deadline"
                    );
                    metrics::record_orphaned(ctx.resource());
                    Outcome::Panicked
                }
            }
        }
        .in_current_span(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_policy_overrides_single_route() {
        let mut config = TimeoutConfig::default();
        config.overrides.push(crate::config::TimeoutOverride {
            resource: ResourceKind::Animal,
            operation: Operation::Clone,
            request_ms: 5000,
        });
        let policy = TimeoutPolicy::from_config(&config);

        assert_eq!(policy.timeout_for(ResourceKind::Animal, Operation::Clone), Duration::from_secs(5));
        assert_eq!(policy.timeout_for(ResourceKind::Person, Operation::Clone), Duration::from_secs(2));
        assert_eq!(policy.timeout_for(ResourceKind::Animal, Operation::Read), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_fast_handler_completes() {
        let ctx = RequestContext::new(Duration::from_millis(500));
        let (envelope, outcome) = Dispatcher::new()
            .dispatch_with_outcome(&ctx, async { Envelope::text(StatusCode::OK, "done") })
            .await;

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(envelope.body_str(), "done");
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_slow_handler_times_out_and_result_is_discarded() {
        let ctx = RequestContext::new(Duration::from_millis(50));
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let (envelope, outcome) = Dispatcher::new()
            .dispatch_with_outcome(&ctx, async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                flag.store(true, Ordering::SeqCst);
                Envelope::text(StatusCode::OK, "late")
            })
            .await;

        assert_eq!(outcome, Outcome::TimedOut);
        assert_eq!(envelope, Envelope::timeout());
        assert!(ctx.is_cancelled());

        // The handler keeps running in the background; its result goes nowhere.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_timeout_fires_near_deadline() {
        let ctx = RequestContext::new(Duration::from_millis(100));
        let start = std::time::Instant::now();

        let envelope = Dispatcher::new()
            .dispatch(&ctx, std::future::pending::<Envelope>())
            .await;

        assert_eq!(envelope.status, StatusCode::REQUEST_TIMEOUT);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(90), "returned early: {waited:?}");
        assert!(waited < Duration::from_millis(1000), "hung: {waited:?}");
    }

    fn handler_fails() -> bool {
        true
    }

    #[tokio::test]
    async fn test_panicking_handler_yields_500() {
        let ctx = RequestContext::new(Duration::from_secs(1));
        let (envelope, outcome) = Dispatcher::new()
            .dispatch_with_outcome(&ctx, async {
                if handler_fails() {
                    panic!("handler blew up");
                }
                Envelope::no_content()
            })
            .await;

        assert_eq!(outcome, Outcome::Panicked);
        assert_eq!(envelope.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_late_panic_is_observed() {
        let ctx = RequestContext::new(Duration::from_millis(10));
        let late = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            if handler_fails() {
                panic!("late failure");
            }
            Envelope::no_content()
        });

        let outcome = watch_orphan(ctx, late).await.unwrap();
        assert_eq!(outcome, Outcome::Panicked);
    }

    #[tokio::test]
    async fn test_cancellation_reaches_handler() {
        let ctx = RequestContext::new(Duration::from_millis(30));
        let token = ctx.cancellation().clone();
        let observed = Arc::new(AtomicBool::new(false));
        let seen = observed.clone();

        Dispatcher::new()
            .dispatch(&ctx, async move {
                token.cancelled().await;
                seen.store(true, Ordering::SeqCst);
                Envelope::no_content()
            })
            .await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(observed.load(Ordering::SeqCst));
    }
}
