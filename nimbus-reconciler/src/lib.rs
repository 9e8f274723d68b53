//! Asynchronous, idempotent reconciliation of cluster cloud network resources.
//!
//! Services ([`services`]) derive resource specs from a scope ([`scope`]) and
//! drive each through the [`AsyncReconciler`], which persists long-running
//! operation futures in the scope so a later tick resumes polling instead of
//! re-issuing the call.

pub mod client;
pub mod conditions;
pub mod config;
pub mod context;
pub mod error;
pub mod future;
pub mod merge;
pub mod models;
pub mod reconciler;
pub mod resource_id;
pub mod scope;
pub mod services;
pub mod spec;
pub mod tags;

pub use client::{AsyncOutcome, ResourceClient, TagsGetter, classify_response};
pub use conditions::{Condition, ConditionSeverity, ConditionState};
pub use config::{ClusterConfig, Timeouts};
pub use context::ReconcileContext;
pub use error::{ErrorKind, ReconcileError, Result, combine};
pub use future::{FutureType, OperationFuture, ResumeToken};
pub use models::{Resource, ResourceKind};
pub use reconciler::{AsyncReconciler, Reconciler};
pub use scope::{ClusterScope, MachinePoolMachineScope, MachineRef, ScopeStatus};
pub use services::{ServicePipeline, ServiceReconciler};
pub use spec::ResourceSpec;
pub use tags::Tags;
