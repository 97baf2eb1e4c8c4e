//! Observability sink for degraded collaborator calls.
//!
//! The query layer never logs collaborator failures through a global handle;
//! it reports them to the [`Observer`] it was constructed with.

use std::sync::Mutex;

use crate::errors::CollaboratorError;

/// One failed collaborator call.
#[derive(Debug, Clone)]
pub struct FailureEvent<'a> {
    /// Collaborator operation, e.g. `fetch_matching`.
    pub operation: &'static str,
    /// Identifying keys of the call (article id, tag name, ...).
    pub context: &'a str,
    pub error: &'a CollaboratorError,
    /// Whether the failure was absorbed into an empty result.
    pub degraded: bool,
}

pub trait Observer: Send + Sync {
    fn collaborator_failed(&self, event: &FailureEvent<'_>);
}

/// Emits failures as `tracing` warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn collaborator_failed(&self, event: &FailureEvent<'_>) {
        tracing::warn!(
            operation = event.operation,
            context = event.context,
            degraded = event.degraded,
            error = %event.error,
            "collaborator call failed"
        );
    }
}

/// Owned copy of a [`FailureEvent`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFailure {
    pub operation: &'static str,
    pub context: String,
    pub message: String,
    pub degraded: bool,
}

/// Keeps every reported failure in memory; also forwards to `tracing`.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RecordedFailure>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedFailure> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Observer for RecordingObserver {
    fn collaborator_failed(&self, event: &FailureEvent<'_>) {
        TracingObserver.collaborator_failed(event);
        let record = RecordedFailure {
            operation: event.operation,
            context: event.context.to_string(),
            message: event.error.to_string(),
            degraded: event.degraded,
        };
        match self.events.lock() {
            Ok(mut events) => events.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_observer_keeps_events_in_order() {
        let observer = RecordingObserver::new();
        let first = CollaboratorError::unavailable("tag service down");
        let second = CollaboratorError::Cancelled {
            operation: "fetch_current",
        };

        observer.collaborator_failed(&FailureEvent {
            operation: "find_tags_by_name",
            context: "tag=finance",
            error: &first,
            degraded: true,
        });
        observer.collaborator_failed(&FailureEvent {
            operation: "fetch_current",
            context: "groupId=20 articleId=A",
            error: &second,
            degraded: true,
        });

        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].operation, "find_tags_by_name");
        assert_eq!(events[0].message, "tag service down");
        assert_eq!(events[1].message, "fetch_current cancelled");
    }
}
