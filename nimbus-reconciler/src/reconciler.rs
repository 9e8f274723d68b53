//! The uniform create/update/delete engine.
//!
//! [`AsyncReconciler`] drives one [`ResourceSpec`] at a time:
//!
//! - a persisted future for the spec is polled instead of re-issuing the call
//! - otherwise the live state is fetched, `parameters` decides whether a PUT
//!   is needed, and the PUT runs with the existing entity tag as `If-Match`
//! - a mutation that outlives its call budget comes back from the client as a
//!   resume token, which is stored on the scope as a future before
//!   `OperationNotDone` surfaces
//!
//! Create and delete never overlap on the same resource: each refuses to
//! start while the other's future is in flight.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::{AsyncOutcome, ResourceClient};
use crate::context::ReconcileContext;
use crate::error::{ReconcileError, Result};
use crate::future::{FutureType, OperationFuture};
use crate::models::Resource;
use crate::scope::FutureScope;
use crate::spec::ResourceSpec;

/// Create/update and delete of a single spec.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Converge the resource. Returns the resulting (or unchanged) state.
    async fn create_or_update_resource(
        &self,
        ctx: &ReconcileContext,
        spec: &dyn ResourceSpec,
        service_name: &str,
    ) -> Result<Option<Resource>>;

    /// Delete the resource. Absent resources are a success.
    async fn delete_resource(
        &self,
        ctx: &ReconcileContext,
        spec: &dyn ResourceSpec,
        service_name: &str,
    ) -> Result<()>;
}

/// [`Reconciler`] backed by a vendor client, persisting futures on a scope.
pub struct AsyncReconciler {
    client: Arc<dyn ResourceClient>,
    scope: Arc<dyn FutureScope>,
}

impl AsyncReconciler {
    pub fn new(client: Arc<dyn ResourceClient>, scope: Arc<dyn FutureScope>) -> Self {
        Self { client, scope }
    }

    /// Poll a persisted future once.
    ///
    /// A future that cannot be decoded is dropped so the next tick starts
    /// over. A future that is not done stays on the scope. A finished future
    /// is removed once its result has been fetched, or once the result says
    /// the resource is gone; any other failure keeps it for the next tick.
    async fn process_ongoing_operation(
        &self,
        ctx: &ReconcileContext,
        future: OperationFuture,
    ) -> Result<Option<Resource>> {
        let timeouts = self.scope.timeouts();

        let token = match future.resume_token() {
            Ok(token) => token,
            Err(e) => {
                warn!(
                    "Resetting {} operation on {}/{} (service: {}): {}",
                    future.future_type, future.resource_group, future.name, future.service_name, e
                );
                self.clear(&future);
                return Err(e);
            }
        };

        let done = match ctx
            .call(
                "is_done",
                timeouts.call(),
                timeouts.requeue_after(),
                self.client.is_done(&token),
            )
            .await
        {
            Ok(done) => done,
            // Running out of time while polling is the same as not done.
            Err(ReconcileError::DeadlineExceeded { .. }) => false,
            Err(e) => return Err(e),
        };

        if !done {
            debug!(
                "{} operation on {}/{} (service: {}) still in progress",
                future.future_type, future.resource_group, future.name, future.service_name
            );
            return Err(ReconcileError::operation_not_done(future, timeouts.requeue_after()));
        }

        let result = ctx
            .call(
                "result",
                timeouts.call(),
                timeouts.requeue_after(),
                self.client.result(&token, future.future_type),
            )
            .await;

        match result {
            Ok(resource) => {
                info!(
                    "{} operation on {}/{} (service: {}) completed",
                    future.future_type, future.resource_group, future.name, future.service_name
                );
                self.clear(&future);
                Ok(resource)
            }
            Err(e) if e.is_not_found() => {
                debug!(
                    "{} operation on {}/{} (service: {}) completed, resource gone",
                    future.future_type, future.resource_group, future.name, future.service_name
                );
                self.clear(&future);
                Err(e)
            }
            Err(e) => {
                warn!(
                    "Failed to fetch result of {} operation on {}/{} (service: {}), keeping future: {}",
                    future.future_type, future.resource_group, future.name, future.service_name, e
                );
                Err(e)
            }
        }
    }

    fn clear(&self, future: &OperationFuture) {
        self.scope.delete_long_running_operation_state(
            &future.name,
            &future.service_name,
            future.future_type,
        );
    }

    fn persist(&self, future: OperationFuture) -> ReconcileError {
        info!(
            "{} operation on {}/{} (service: {}) is in progress, storing future",
            future.future_type, future.resource_group, future.name, future.service_name
        );
        self.scope.set_long_running_operation_state(future.clone());
        ReconcileError::operation_not_done(future, self.scope.timeouts().requeue_after())
    }
}

#[async_trait]
impl Reconciler for AsyncReconciler {
    async fn create_or_update_resource(
        &self,
        ctx: &ReconcileContext,
        spec: &dyn ResourceSpec,
        service_name: &str,
    ) -> Result<Option<Resource>> {
        let name = spec.resource_name();
        let rg = spec.resource_group_name();
        let timeouts = self.scope.timeouts();

        if let Some(future) =
            self.scope
                .get_long_running_operation_state(name, service_name, FutureType::Delete)
        {
            return Err(ReconcileError::DeleteInProgress {
                future: Box::new(future),
                retry_after: timeouts.requeue_after(),
            });
        }

        if let Some(future) =
            self.scope
                .get_long_running_operation_state(name, service_name, FutureType::Create)
        {
            debug!("Found create future for {}/{} (service: {})", rg, name, service_name);
            return self.process_ongoing_operation(ctx, future).await;
        }

        let existing = match ctx
            .call("get", timeouts.call(), timeouts.requeue_after(), self.client.get(spec))
            .await
        {
            Ok(resource) => Some(resource),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let Some(parameters) = spec.parameters(existing.as_ref())? else {
            debug!("{}/{} (service: {}) is up to date", rg, name, service_name);
            return Ok(existing);
        };

        let if_match = parameters.etag().map(str::to_string);
        if existing.is_some() {
            info!("Updating {}/{} (service: {})", rg, name, service_name);
        } else {
            info!("Creating {}/{} (service: {})", rg, name, service_name);
        }

        let budget = ctx.budget(timeouts.call());
        let outcome = ctx
            .run(
                "create_or_update",
                timeouts.requeue_after(),
                self.client.create_or_update_async(spec, parameters, if_match, budget),
            )
            .await?;

        match outcome {
            AsyncOutcome::Done(result) => {
                info!("Created or updated {}/{} (service: {})", rg, name, service_name);
                Ok(Some(result))
            }
            AsyncOutcome::InProgress(token) => Err(self.persist(OperationFuture::new(
                FutureType::Create,
                name,
                rg,
                service_name,
                &token,
            ))),
        }
    }

    async fn delete_resource(
        &self,
        ctx: &ReconcileContext,
        spec: &dyn ResourceSpec,
        service_name: &str,
    ) -> Result<()> {
        let name = spec.resource_name();
        let rg = spec.resource_group_name();
        let timeouts = self.scope.timeouts();

        if let Some(future) =
            self.scope
                .get_long_running_operation_state(name, service_name, FutureType::Create)
        {
            return Err(ReconcileError::NonDeleteInProgress {
                future: Box::new(future),
                retry_after: timeouts.requeue_after(),
            });
        }

        if let Some(future) =
            self.scope
                .get_long_running_operation_state(name, service_name, FutureType::Delete)
        {
            debug!("Found delete future for {}/{} (service: {})", rg, name, service_name);
            return match self.process_ongoing_operation(ctx, future).await {
                Ok(_) => Ok(()),
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(e),
            };
        }

        info!("Deleting {}/{} (service: {})", rg, name, service_name);
        let budget = ctx.budget(timeouts.call());
        let outcome = ctx
            .run("delete", timeouts.requeue_after(), self.client.delete_async(spec, budget))
            .await;

        match outcome {
            Ok(AsyncOutcome::Done(())) => {
                info!("Deleted {}/{} (service: {})", rg, name, service_name);
                Ok(())
            }
            Ok(AsyncOutcome::InProgress(token)) => Err(self.persist(OperationFuture::new(
                FutureType::Delete,
                name,
                rg,
                service_name,
                &token,
            ))),
            Err(e) if e.is_not_found() => {
                debug!("{}/{} (service: {}) already deleted", rg, name, service_name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
