//! Service façades, one per resource kind.
//!
//! A service enumerates its scope's specs, runs each through the
//! [`Reconciler`], folds the per-spec errors by precedence and writes one
//! condition. Deletion is gated on the cluster ownership tag: resources that
//! do not carry it are never touched.

pub mod bastionhosts;
pub mod loadbalancers;
pub mod privatedns;
pub mod privatelinks;
pub mod publicips;
pub mod routetables;
pub mod scalesetvms;
pub mod virtualnetworks;

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::{debug, info, warn};

use crate::client::{ResourceClient, TagsGetter};
use crate::context::ReconcileContext;
use crate::error::{ErrorAggregate, ReconcileError, Result};
use crate::future::FutureType;
use crate::models::Resource;
use crate::reconciler::{AsyncReconciler, Reconciler};
use crate::scope::ServiceScope;
use crate::spec::ResourceSpec;

/// A reconcilable service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ServiceReconciler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn reconcile(&self, ctx: &ReconcileContext) -> Result<()>;

    async fn delete(&self, ctx: &ReconcileContext) -> Result<()>;
}

// =============================================================================
// Ownership gate
// =============================================================================

/// Result of the ownership check before a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Tagged as owned by this cluster.
    Owned,
    /// Exists but belongs to someone else.
    Unmanaged,
    /// Does not exist.
    Missing,
}

// =============================================================================
// Shared service plumbing
// =============================================================================

/// Per-spec results of a create/update pass.
#[derive(Debug, Default)]
pub struct SpecOutcomes {
    /// Resulting state for each spec, in spec order; `None` when the spec
    /// failed or the resource has no state yet.
    pub resources: Vec<Option<Resource>>,
    /// Highest-precedence error seen.
    pub error: Option<ReconcileError>,
}

impl SpecOutcomes {
    pub fn into_result(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Results of a delete pass.
#[derive(Debug, Default)]
pub struct DeleteOutcome {
    pub error: Option<ReconcileError>,
    /// False when every spec was skipped as unmanaged.
    pub touched: bool,
}

impl DeleteOutcome {
    pub fn into_result(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// What every service holds: its scope, the engine and the clients used by
/// the ownership gate.
pub struct ServiceCore<S: ?Sized> {
    pub scope: Arc<S>,
    reconciler: Arc<dyn Reconciler>,
    client: Arc<dyn ResourceClient>,
    tags_getter: Option<Arc<dyn TagsGetter>>,
}

impl<S: ServiceScope + 'static> ServiceCore<S> {
    pub fn new(scope: Arc<S>, client: Arc<dyn ResourceClient>) -> Self {
        let reconciler = Arc::new(AsyncReconciler::new(client.clone(), scope.clone()));
        Self {
            scope,
            reconciler,
            client,
            tags_getter: None,
        }
    }
}

impl<S: ServiceScope + ?Sized> ServiceCore<S> {
    /// Use bulk tag lookups for the ownership gate.
    pub fn with_tags_getter(mut self, tags_getter: Arc<dyn TagsGetter>) -> Self {
        self.tags_getter = Some(tags_getter);
        self
    }

    pub fn reconciler(&self) -> &dyn Reconciler {
        self.reconciler.as_ref()
    }

    /// Context bounded by the service reconcile budget.
    pub fn service_context(&self, ctx: &ReconcileContext) -> ReconcileContext {
        ctx.with_timeout(self.scope.timeouts().service_reconcile())
    }

    /// Create or update every spec without short-circuiting.
    pub async fn create_or_update_specs(
        &self,
        ctx: &ReconcileContext,
        specs: &[&dyn ResourceSpec],
        service: &str,
    ) -> SpecOutcomes {
        let mut errors = ErrorAggregate::new();
        let mut resources = Vec::with_capacity(specs.len());
        for spec in specs {
            match self
                .reconciler
                .create_or_update_resource(ctx, *spec, service)
                .await
            {
                Ok(resource) => resources.push(resource),
                Err(e) => {
                    if !e.is_transient() {
                        warn!(
                            "Failed to reconcile {}/{} (service: {}): {}",
                            spec.resource_group_name(),
                            spec.resource_name(),
                            service,
                            e
                        );
                    }
                    resources.push(None);
                    errors.record::<()>(Err(e));
                }
            }
        }
        SpecOutcomes {
            resources,
            error: errors.into_result().err(),
        }
    }

    /// Create or update every spec and write the put condition.
    pub async fn reconcile_specs(
        &self,
        ctx: &ReconcileContext,
        specs: &[&dyn ResourceSpec],
        service: &str,
        condition_type: &str,
    ) -> SpecOutcomes {
        let outcomes = self.create_or_update_specs(ctx, specs, service).await;
        self.scope
            .update_put_status(condition_type, service, outcomes.error.as_ref());
        outcomes
    }

    /// Check whether the resource behind `spec` carries this cluster's
    /// ownership tag.
    ///
    /// Uses the bulk tag lookup when configured and falls back to a full
    /// fetch when it is absent or fails.
    pub async fn ownership(&self, ctx: &ReconcileContext, spec: &dyn ResourceSpec) -> Result<Ownership> {
        let timeouts = self.scope.timeouts();
        let cluster_name = self.scope.cluster_name();

        if let Some(getter) = &self.tags_getter {
            let resource_id = spec.resource_id();
            match ctx
                .call(
                    "get_tags_at_scope",
                    timeouts.call(),
                    timeouts.requeue_after(),
                    getter.get_at_scope(&resource_id),
                )
                .await
            {
                Ok(tags) if tags.has_owned(cluster_name) => return Ok(Ownership::Owned),
                Ok(_) => return Ok(Ownership::Unmanaged),
                Err(e) if e.is_not_found() => return Ok(Ownership::Missing),
                Err(e) => {
                    warn!(
                        "Tag lookup for {} failed, falling back to get: {}",
                        resource_id, e
                    );
                }
            }
        }

        match ctx
            .call("get", timeouts.call(), timeouts.requeue_after(), self.client.get(spec))
            .await
        {
            Ok(resource) if resource.tags().has_owned(cluster_name) => Ok(Ownership::Owned),
            Ok(_) => Ok(Ownership::Unmanaged),
            Err(e) if e.is_not_found() => Ok(Ownership::Missing),
            Err(e) => Err(e),
        }
    }

    /// Delete one spec behind the ownership gate.
    ///
    /// A persisted future for the spec bypasses the gate: the deletion (or a
    /// conflicting create) is already under way. Returns whether the spec
    /// was acted on.
    pub async fn delete_if_owned(
        &self,
        ctx: &ReconcileContext,
        spec: &dyn ResourceSpec,
        service: &str,
    ) -> (bool, Result<()>) {
        let name = spec.resource_name();
        let in_flight = [FutureType::Delete, FutureType::Create].into_iter().any(|t| {
            self.scope
                .get_long_running_operation_state(name, service, t)
                .is_some()
        });
        if in_flight {
            return (true, self.reconciler.delete_resource(ctx, spec, service).await);
        }

        match self.ownership(ctx, spec).await {
            Ok(Ownership::Owned) => (true, self.reconciler.delete_resource(ctx, spec, service).await),
            Ok(Ownership::Unmanaged) => {
                info!(
                    "Skipping delete of unmanaged {}/{} (service: {})",
                    spec.resource_group_name(),
                    name,
                    service
                );
                (false, Ok(()))
            }
            Ok(Ownership::Missing) => {
                debug!(
                    "{}/{} (service: {}) does not exist, nothing to delete",
                    spec.resource_group_name(),
                    name,
                    service
                );
                (true, Ok(()))
            }
            Err(e) => (true, Err(e)),
        }
    }

    /// Delete every owned spec without short-circuiting.
    pub async fn delete_specs(
        &self,
        ctx: &ReconcileContext,
        specs: &[&dyn ResourceSpec],
        service: &str,
    ) -> DeleteOutcome {
        let mut errors = ErrorAggregate::new();
        let mut touched = specs.is_empty();
        for spec in specs {
            let (acted, result) = self.delete_if_owned(ctx, *spec, service).await;
            touched |= acted;
            errors.record(result);
        }
        DeleteOutcome {
            error: errors.into_result().err(),
            touched,
        }
    }

    /// Delete every owned spec and write the delete condition unless every
    /// spec was unmanaged.
    pub async fn delete_specs_with_status(
        &self,
        ctx: &ReconcileContext,
        specs: &[&dyn ResourceSpec],
        service: &str,
        condition_type: &str,
    ) -> DeleteOutcome {
        let outcome = self.delete_specs(ctx, specs, service).await;
        if outcome.touched {
            self.scope
                .update_delete_status(condition_type, service, outcome.error.as_ref());
        }
        outcome
    }
}

/// Borrow a list of concrete specs as trait objects.
pub fn as_dyn_specs<T: ResourceSpec>(specs: &[T]) -> Vec<&dyn ResourceSpec> {
    specs.iter().map(|s| s as &dyn ResourceSpec).collect()
}

// =============================================================================
// Pipeline
// =============================================================================

/// An ordered list of services run in one tick.
///
/// Reconcile runs in order and stops at the first failing service; delete
/// runs in reverse order.
pub struct ServicePipeline {
    services: Vec<Arc<dyn ServiceReconciler>>,
}

impl ServicePipeline {
    pub fn new(services: Vec<Arc<dyn ServiceReconciler>>) -> Self {
        Self { services }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    pub async fn reconcile(&self, ctx: &ReconcileContext) -> Result<()> {
        for service in &self.services {
            debug!("Reconciling service {}", service.name());
            service
                .reconcile(ctx)
                .await
                .map_err(|e| e.in_service(service.name()))?;
        }
        Ok(())
    }

    pub async fn delete(&self, ctx: &ReconcileContext) -> Result<()> {
        for service in self.services.iter().rev() {
            debug!("Deleting service {}", service.name());
            service
                .delete(ctx)
                .await
                .map_err(|e| e.in_service(service.name()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use mockall::Sequence;

    use super::*;

    fn service(name: &'static str, result: fn() -> Result<()>) -> MockServiceReconciler {
        let mut mock = MockServiceReconciler::new();
        mock.expect_name().return_const(name);
        mock.expect_reconcile().returning(move |_| result());
        mock.expect_delete().returning(move |_| result());
        mock
    }

    #[tokio::test]
    async fn test_pipeline_runs_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut services: Vec<Arc<dyn ServiceReconciler>> = Vec::new();
        for name in ["virtualnetworks", "publicips", "loadbalancers"] {
            let mut mock = MockServiceReconciler::new();
            mock.expect_name().return_const(name);
            let order = order.clone();
            mock.expect_reconcile().times(1).returning(move |_| {
                order.lock().unwrap().push(name);
                Ok(())
            });
            services.push(Arc::new(mock));
        }

        let pipeline = ServicePipeline::new(services);
        pipeline.reconcile(&ReconcileContext::background()).await.unwrap();
        assert_eq!(
            *order.lock().unwrap(),
            vec!["virtualnetworks", "publicips", "loadbalancers"]
        );
    }

    #[tokio::test]
    async fn test_pipeline_stops_at_first_failure() {
        let first = service("virtualnetworks", || {
            Err(ReconcileError::Throttled {
                message: "slow".to_string(),
                retry_after: Duration::from_secs(15),
            })
        });
        let mut second = MockServiceReconciler::new();
        second.expect_name().return_const("publicips");
        second.expect_reconcile().never();

        let pipeline = ServicePipeline::new(vec![Arc::new(first), Arc::new(second)]);
        let err = pipeline
            .reconcile(&ReconcileContext::background())
            .await
            .unwrap_err();

        assert!(matches!(&err, ReconcileError::Service { service, .. } if service == "virtualnetworks"));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_pipeline_deletes_in_reverse() {
        let mut seq = Sequence::new();
        let mut first = MockServiceReconciler::new();
        let mut second = MockServiceReconciler::new();
        first.expect_name().return_const("virtualnetworks");
        second.expect_name().return_const("loadbalancers");
        second
            .expect_delete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        first
            .expect_delete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let pipeline = ServicePipeline::new(vec![Arc::new(first), Arc::new(second)]);
        assert_eq!(pipeline.names(), vec!["virtualnetworks", "loadbalancers"]);
        pipeline.delete(&ReconcileContext::background()).await.unwrap();
    }
}
