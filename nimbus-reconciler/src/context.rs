//! Deadline propagation for a reconcile tick.
//!
//! A [`ReconcileContext`] carries the absolute deadline of the enclosing
//! service reconcile. Reads run under the tighter of that deadline and their
//! own per-call budget. Mutations receive their budget as an argument and
//! hand back a resume token when it runs out, so only the parent deadline
//! cuts them off. Dropping the returned future cancels the in-flight call;
//! persisted operation futures are unaffected.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};

use crate::error::{ReconcileError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileContext {
    deadline: Option<Instant>,
}

impl ReconcileContext {
    /// A context without a deadline.
    pub fn background() -> Self {
        Self { deadline: None }
    }

    /// Derive a child context that expires after `timeout`, never later than
    /// the parent.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < candidate => parent,
            _ => candidate,
        };
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// The per-call budget, shortened to what is left of the deadline.
    pub fn budget(&self, budget: Duration) -> Duration {
        match self.deadline {
            Some(deadline) => budget.min(deadline.saturating_duration_since(Instant::now())),
            None => budget,
        }
    }

    /// Run a call under the parent deadline only.
    ///
    /// Used for mutations that enforce their own budget. Running out of time
    /// yields [`ReconcileError::DeadlineExceeded`].
    pub async fn run<T, F>(&self, operation: &str, retry_after: Duration, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let Some(deadline) = self.deadline else {
            return call.await;
        };
        match timeout_at(deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(ReconcileError::DeadlineExceeded {
                operation: operation.to_string(),
                retry_after,
            }),
        }
    }

    /// Run one vendor call under its budget.
    ///
    /// Running out of time yields [`ReconcileError::DeadlineExceeded`] with
    /// `retry_after` as the requeue hint.
    pub async fn call<T, F>(
        &self,
        operation: &str,
        budget: Duration,
        retry_after: Duration,
        call: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = self.with_timeout(budget).deadline.unwrap_or_else(Instant::now);
        match timeout_at(deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(ReconcileError::DeadlineExceeded {
                operation: operation.to_string(),
                retry_after,
            }),
        }
    }
}
