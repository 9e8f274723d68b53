//! Vendor API capability.
//!
//! The concrete transport (REST, SDK) lives outside this crate. The engine
//! only needs the operations below; mutating calls return either a terminal
//! result or a resume token for the in-flight operation.
//!
//! Mutating calls take a `budget`. An implementation waits at most that long
//! for the vendor operation to finish and then returns
//! [`AsyncOutcome::InProgress`] with a token for the still-running operation.
//! It never returns an error just because the budget ran out.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::config::DEFAULT_REQUEUE_AFTER_SECS;
use crate::error::{ReconcileError, Result};
use crate::future::{FutureType, ResumeToken};
use crate::models::Resource;
use crate::spec::ResourceSpec;
use crate::tags::Tags;

/// Outcome of a mutating vendor call.
#[derive(Debug, Clone, PartialEq)]
pub enum AsyncOutcome<T> {
    /// The operation finished within the call budget.
    Done(T),
    /// The operation is still running; poll with the token.
    InProgress(ResumeToken),
}

/// Resource CRUD with long-running operation support.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetch the current state. Absent resources yield `NotFound`.
    async fn get(&self, spec: &dyn ResourceSpec) -> Result<Resource>;

    /// PUT `parameters`. When `if_match` is set the vendor rejects the
    /// request with `PreconditionFailed` if the entity tag moved.
    async fn create_or_update_async(
        &self,
        spec: &dyn ResourceSpec,
        parameters: Resource,
        if_match: Option<String>,
        budget: Duration,
    ) -> Result<AsyncOutcome<Resource>>;

    async fn delete_async(&self, spec: &dyn ResourceSpec, budget: Duration) -> Result<AsyncOutcome<()>>;

    /// Poll an in-flight operation once.
    async fn is_done(&self, token: &ResumeToken) -> Result<bool>;

    /// Final result of a completed operation (`None` for deletes).
    async fn result(&self, token: &ResumeToken, future_type: FutureType) -> Result<Option<Resource>>;
}

/// Bulk tag lookup by resource ID.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TagsGetter: Send + Sync {
    async fn get_at_scope(&self, resource_id: &str) -> Result<Tags>;
}

/// Map a vendor HTTP failure onto the error taxonomy.
pub fn classify_response(
    resource: &str,
    status: u16,
    code: &str,
    message: &str,
    retry_after: Option<Duration>,
) -> ReconcileError {
    let retry_after = retry_after.unwrap_or(Duration::from_secs(DEFAULT_REQUEUE_AFTER_SECS));
    match status {
        404 => ReconcileError::NotFound(resource.to_string()),
        412 => ReconcileError::PreconditionFailed {
            resource: resource.to_string(),
            etag: None,
        },
        429 => ReconcileError::Throttled {
            message: message.to_string(),
            retry_after,
        },
        408 | 502 | 503 | 504 => ReconcileError::Unavailable {
            message: message.to_string(),
            retry_after,
        },
        _ => ReconcileError::Vendor {
            status,
            code: code.to_string(),
            message: message.to_string(),
        },
    }
}
