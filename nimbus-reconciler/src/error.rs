//! Reconciliation error types.
//!
//! Every failure surfaced by the engine is a [`ReconcileError`]. Errors are
//! classified into two [`ErrorKind`]s: transient errors ask the outer
//! controller to requeue, permanent errors mark the owning object degraded.
//! When a service fans out over several specs the errors are folded with
//! [`combine`], which keeps the most pressing one.

use std::time::Duration;

use thiserror::Error;

use crate::future::OperationFuture;

/// Severity class of a [`ReconcileError`], ordered by precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// Retry on the next tick.
    Transient,
    /// Surfaced to the user; never hidden by a transient error.
    Permanent,
}

/// Errors that can occur while reconciling cloud resources.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A long-running operation is still in flight.
    #[error(
        "operation type {} on resource {}/{} (service: {}) is not done",
        .future.future_type, .future.resource_group, .future.name, .future.service_name
    )]
    OperationNotDone {
        future: Box<OperationFuture>,
        retry_after: Duration,
    },

    /// Delete requested while a create/update is still in flight.
    #[error(
        "cannot delete resource {}/{} (service: {}): a {} operation is in progress",
        .future.resource_group, .future.name, .future.service_name, .future.future_type
    )]
    NonDeleteInProgress {
        future: Box<OperationFuture>,
        retry_after: Duration,
    },

    /// Create/update requested while a delete is still in flight.
    #[error(
        "cannot create or update resource {}/{} (service: {}): a {} operation is in progress",
        .future.resource_group, .future.name, .future.service_name, .future.future_type
    )]
    DeleteInProgress {
        future: Box<OperationFuture>,
        retry_after: Duration,
    },

    /// The vendor throttled the request.
    #[error("throttled: {message}")]
    Throttled {
        message: String,
        retry_after: Duration,
    },

    /// Connection reset, gateway timeout and similar network hiccups.
    #[error("service unavailable: {message}")]
    Unavailable {
        message: String,
        retry_after: Duration,
    },

    /// A vendor call did not finish within its budget.
    #[error("deadline exceeded: {operation}")]
    DeadlineExceeded {
        operation: String,
        retry_after: Duration,
    },

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Entity tag mismatch (optimistic concurrency control).
    #[error("precondition failed for {resource}: etag {etag:?} is stale")]
    PreconditionFailed {
        resource: String,
        etag: Option<String>,
    },

    /// An existing resource did not have the expected kind.
    #[error("{actual} is not a {expected}")]
    TypeMismatch { expected: String, actual: String },

    /// Any other vendor rejection.
    #[error("vendor error {status} ({code}): {message}")]
    Vendor {
        status: u16,
        code: String,
        message: String,
    },

    /// The vendor returned something we could not understand.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Persisted future data could not be decoded.
    #[error("could not decode future data: {0}")]
    MalformedFuture(String),

    /// A spec failed its invariant checks.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A service in a pipeline failed.
    #[error("failed to reconcile service {service}: {source}")]
    Service {
        service: String,
        #[source]
        source: Box<ReconcileError>,
    },
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

impl ReconcileError {
    /// Build the transient error returned while a future is in flight.
    pub fn operation_not_done(future: OperationFuture, retry_after: Duration) -> Self {
        ReconcileError::OperationNotDone {
            future: Box::new(future),
            retry_after,
        }
    }

    /// Wrap an error with the name of the service that produced it.
    pub fn in_service(self, service: &str) -> Self {
        ReconcileError::Service {
            service: service.to_string(),
            source: Box::new(self),
        }
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::OperationNotDone { .. }
            | ReconcileError::NonDeleteInProgress { .. }
            | ReconcileError::DeleteInProgress { .. }
            | ReconcileError::Throttled { .. }
            | ReconcileError::Unavailable { .. }
            | ReconcileError::DeadlineExceeded { .. }
            | ReconcileError::PreconditionFailed { .. } => ErrorKind::Transient,
            ReconcileError::NotFound(_)
            | ReconcileError::TypeMismatch { .. }
            | ReconcileError::Vendor { .. }
            | ReconcileError::MalformedResponse(_)
            | ReconcileError::MalformedFuture(_)
            | ReconcileError::Configuration(_) => ErrorKind::Permanent,
            ReconcileError::Service { source, .. } => source.kind(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// True for the resource-absent case, looking through service wrappers.
    pub fn is_not_found(&self) -> bool {
        match self {
            ReconcileError::NotFound(_) => true,
            ReconcileError::Service { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    pub fn is_operation_not_done(&self) -> bool {
        match self {
            ReconcileError::OperationNotDone { .. } => true,
            ReconcileError::Service { source, .. } => source.is_operation_not_done(),
            _ => false,
        }
    }

    /// The in-flight future carried by the error, if any.
    pub fn future(&self) -> Option<&OperationFuture> {
        match self {
            ReconcileError::OperationNotDone { future, .. }
            | ReconcileError::NonDeleteInProgress { future, .. }
            | ReconcileError::DeleteInProgress { future, .. } => Some(future),
            ReconcileError::Service { source, .. } => source.future(),
            _ => None,
        }
    }

    /// Advisory requeue delay for transient errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ReconcileError::OperationNotDone { retry_after, .. }
            | ReconcileError::NonDeleteInProgress { retry_after, .. }
            | ReconcileError::DeleteInProgress { retry_after, .. }
            | ReconcileError::Throttled { retry_after, .. }
            | ReconcileError::Unavailable { retry_after, .. }
            | ReconcileError::DeadlineExceeded { retry_after, .. } => Some(*retry_after),
            ReconcileError::Service { source, .. } => source.retry_after(),
            _ => None,
        }
    }

    /// Short machine-readable reason written on conditions.
    pub fn reason(&self) -> String {
        match self {
            ReconcileError::OperationNotDone { .. } => "OperationNotDone".to_string(),
            ReconcileError::NonDeleteInProgress { .. } => "NonDeleteInProgress".to_string(),
            ReconcileError::DeleteInProgress { .. } => "DeleteInProgress".to_string(),
            ReconcileError::Throttled { .. } => "Throttled".to_string(),
            ReconcileError::Unavailable { .. } => "ServiceUnavailable".to_string(),
            ReconcileError::DeadlineExceeded { .. } => "DeadlineExceeded".to_string(),
            ReconcileError::NotFound(_) => "NotFound".to_string(),
            ReconcileError::PreconditionFailed { .. } => "PreconditionFailed".to_string(),
            ReconcileError::TypeMismatch { .. } => "TypeMismatch".to_string(),
            ReconcileError::Vendor { status, code, .. } => {
                if code.is_empty() {
                    format!("HTTP{}", status)
                } else {
                    code.clone()
                }
            }
            ReconcileError::MalformedResponse(_) => "MalformedResponse".to_string(),
            ReconcileError::MalformedFuture(_) => "MalformedFuture".to_string(),
            ReconcileError::Configuration(_) => "InvalidConfiguration".to_string(),
            ReconcileError::Service { source, .. } => source.reason(),
        }
    }
}

/// Fold two outcomes, keeping the most pressing error.
///
/// A strictly higher [`ErrorKind`] replaces the accumulated error; on equal
/// rank the earlier error wins. `None` (success) is the identity.
pub fn combine(a: Option<ReconcileError>, b: Option<ReconcileError>) -> Option<ReconcileError> {
    match (a, b) {
        (None, b) => b,
        (a, None) => a,
        (Some(a), Some(b)) => {
            if b.kind() > a.kind() {
                Some(b)
            } else {
                Some(a)
            }
        }
    }
}

/// Accumulates per-spec errors for a service without short-circuiting.
#[derive(Debug, Default)]
pub struct ErrorAggregate {
    current: Option<ReconcileError>,
}

impl ErrorAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one spec.
    pub fn record<T>(&mut self, result: Result<T>) {
        if let Err(err) = result {
            self.current = combine(self.current.take(), Some(err));
        }
    }

    /// The highest-precedence error seen so far.
    pub fn error(&self) -> Option<&ReconcileError> {
        self.current.as_ref()
    }

    pub fn into_result(self) -> Result<()> {
        match self.current {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
