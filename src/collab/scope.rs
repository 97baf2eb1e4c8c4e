//! Per-query guard around collaborator calls.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::errors::{AppError, CollaboratorError};
use crate::observe::{FailureEvent, Observer};

/// What a failed collaborator call turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Report the failure and continue with an empty/absent sub-result.
    #[default]
    Degrade,
    /// Report the failure and fail the whole operation.
    Fail,
}

impl FailurePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "degrade" => Some(FailurePolicy::Degrade),
            "fail" => Some(FailurePolicy::Fail),
            _ => None,
        }
    }
}

/// Limits applied to every collaborator call.
#[derive(Debug, Clone)]
pub struct CallSettings {
    pub timeout: Duration,
    /// Extra attempts after an `Unavailable` error. Timeouts are never retried.
    pub retries: u32,
    pub failure_policy: FailurePolicy,
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retries: 0,
            failure_policy: FailurePolicy::Degrade,
        }
    }
}

/// Scope of one query execution.
///
/// Once any call in the scope times out or is cancelled the scope trips and
/// later calls are not issued.
pub struct CallScope {
    settings: CallSettings,
    cancel: CancellationToken,
    observer: Arc<dyn Observer>,
    tripped: AtomicBool,
}

impl CallScope {
    pub fn new(
        settings: CallSettings,
        cancel: CancellationToken,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            settings,
            cancel,
            observer,
            tripped: AtomicBool::new(false),
        }
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire) || self.cancel.is_cancelled()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.settings.failure_policy
    }

    /// Issue one collaborator call with timeout, cancellation and retries.
    pub async fn call<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, CollaboratorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CollaboratorError>>,
    {
        if self.is_tripped() {
            return Err(CollaboratorError::Cancelled { operation });
        }

        let timeout = self.settings.timeout;
        let mut attempt = 0;
        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(CollaboratorError::Cancelled { operation }),
                result = tokio::time::timeout(timeout, call()) => match result {
                    Ok(inner) => inner,
                    Err(_) => Err(CollaboratorError::Timeout { operation, after: timeout }),
                },
            };

            match outcome {
                Err(CollaboratorError::Unavailable(message)) if attempt < self.settings.retries => {
                    attempt += 1;
                    tracing::debug!(operation, attempt, %message, "retrying collaborator call");
                }
                Err(err) if err.is_interruption() => {
                    self.tripped.store(true, Ordering::Release);
                    return Err(err);
                }
                other => return other,
            }
        }
    }

    /// Apply the failure policy to a call result, reporting failures.
    pub fn settle<T>(
        &self,
        operation: &'static str,
        context: &str,
        result: Result<T, CollaboratorError>,
        fallback: T,
    ) -> Result<T, AppError> {
        let error = match result {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let degraded = self.settings.failure_policy == FailurePolicy::Degrade;
        self.observer.collaborator_failed(&FailureEvent {
            operation,
            context,
            error: &error,
            degraded,
        });

        if degraded {
            Ok(fallback)
        } else {
            Err(AppError::CollaboratorUnavailable {
                operation,
                message: error.to_string(),
            })
        }
    }

    /// [`call`](Self::call) followed by [`settle`](Self::settle).
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        context: &str,
        fallback: T,
        call: F,
    ) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CollaboratorError>>,
    {
        let result = self.call(operation, call).await;
        self.settle(operation, context, result, fallback)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;
    use crate::observe::RecordingObserver;

    fn scope(settings: CallSettings) -> (CallScope, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::new());
        let scope = CallScope::new(settings, CancellationToken::new(), observer.clone());
        (scope, observer)
    }

    #[tokio::test]
    async fn degrade_policy_returns_fallback_and_reports() {
        let (scope, observer) = scope(CallSettings::default());

        let value = scope
            .run("find_tags_by_name", "tag=finance", vec![1], || async {
                Err::<Vec<i64>, _>(CollaboratorError::unavailable("down"))
            })
            .await
            .unwrap();

        assert!(value.len() == 1 && value[0] == 1);
        let events = observer.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].context, "tag=finance");
        assert!(events[0].degraded);
        assert!(!scope.is_tripped());
    }

    #[tokio::test]
    async fn fail_policy_surfaces_error() {
        let (scope, observer) = scope(CallSettings {
            failure_policy: FailurePolicy::Fail,
            ..CallSettings::default()
        });

        let result = scope
            .run("fetch_all", "", Vec::<i64>::new(), || async {
                Err(CollaboratorError::unavailable("down"))
            })
            .await;

        assert!(matches!(
            result,
            Err(AppError::CollaboratorUnavailable { operation: "fetch_all", .. })
        ));
        assert!(!observer.events()[0].degraded);
    }

    #[tokio::test]
    async fn retries_unavailable_errors() {
        let (scope, _) = scope(CallSettings {
            retries: 2,
            ..CallSettings::default()
        });
        let attempts = AtomicU32::new(0);

        let result = scope
            .call("fetch_all", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(CollaboratorError::unavailable("flaky"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn timeout_trips_scope_and_skips_later_calls() {
        let (scope, _) = scope(CallSettings {
            timeout: Duration::from_millis(20),
            ..CallSettings::default()
        });

        let slow = scope
            .call("find_tags_by_name", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(vec![1_i64])
            })
            .await;
        assert!(matches!(slow, Err(CollaboratorError::Timeout { .. })));
        assert!(scope.is_tripped());

        let issued = AtomicBool::new(false);
        let skipped = scope
            .call("fetch_matching", || {
                issued.store(true, Ordering::SeqCst);
                async { Ok(Vec::<i64>::new()) }
            })
            .await;
        assert!(matches!(skipped, Err(CollaboratorError::Cancelled { .. })));
        assert!(!issued.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancellation_interrupts_in_flight_call() {
        let token = CancellationToken::new();
        let scope = CallScope::new(
            CallSettings::default(),
            token.clone(),
            Arc::new(RecordingObserver::new()),
        );

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });
        let result = scope
            .call("fetch_all", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        canceller.await.unwrap();

        assert!(matches!(result, Err(CollaboratorError::Cancelled { operation: "fetch_all" })));
        assert!(scope.is_tripped());
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!(FailurePolicy::parse("fail"), Some(FailurePolicy::Fail));
        assert_eq!(FailurePolicy::parse("degrade"), Some(FailurePolicy::Degrade));
        assert_eq!(FailurePolicy::parse("retry"), None);
    }
}
