//! Scope contracts consumed by the engine, and the concrete scopes.
//!
//! A scope is the per-cluster context shared by every service in a tick: it
//! describes the cluster, persists long-running operation futures and
//! receives condition updates. Services name the narrower contract they need
//! (for example `LoadBalancerScope`) and the concrete scopes implement them.

pub mod cluster;
pub mod machinepool;
pub mod status;

use crate::config::Timeouts;
use crate::error::ReconcileError;
use crate::future::{FutureType, OperationFuture};
use crate::tags::Tags;

pub use cluster::ClusterScope;
pub use machinepool::{MachinePoolMachineScope, MachineRef};
pub use status::{ScopeStatus, StatusStore};

// =============================================================================
// Future persistence
// =============================================================================

/// Persistence of long-running operation futures.
pub trait FutureScope: Send + Sync {
    fn get_long_running_operation_state(
        &self,
        name: &str,
        service: &str,
        future_type: FutureType,
    ) -> Option<OperationFuture>;

    /// Store a future, replacing any future for the same resource and service.
    fn set_long_running_operation_state(&self, future: OperationFuture);

    fn delete_long_running_operation_state(&self, name: &str, service: &str, future_type: FutureType);

    fn timeouts(&self) -> Timeouts;
}

// =============================================================================
// Status output
// =============================================================================

/// Condition sink.
pub trait AsyncStatusUpdater: FutureScope {
    fn update_put_status(&self, condition_type: &str, service: &str, err: Option<&ReconcileError>);

    fn update_delete_status(&self, condition_type: &str, service: &str, err: Option<&ReconcileError>);
}

// =============================================================================
// Cluster identity
// =============================================================================

pub trait ClusterDescriber: Send + Sync {
    fn subscription_id(&self) -> &str;
    fn resource_group(&self) -> &str;
    fn location(&self) -> &str;
    fn cluster_name(&self) -> &str;
    fn additional_tags(&self) -> &Tags;
    fn failure_domains(&self) -> &[String];
}

/// Everything a service façade needs from its scope.
pub trait ServiceScope: AsyncStatusUpdater + ClusterDescriber {}

impl<T: AsyncStatusUpdater + ClusterDescriber + ?Sized> ServiceScope for T {}

/// Shared [`FutureScope`] and [`AsyncStatusUpdater`] wiring over a
/// [`StatusStore`] field.
macro_rules! impl_status_scope {
    ($scope:ty, $store:ident) => {
        impl $crate::scope::FutureScope for $scope {
            fn get_long_running_operation_state(
                &self,
                name: &str,
                service: &str,
                future_type: $crate::future::FutureType,
            ) -> Option<$crate::future::OperationFuture> {
                self.$store.get_future(name, service, future_type)
            }

            fn set_long_running_operation_state(&self, future: $crate::future::OperationFuture) {
                self.$store.set_future(future);
            }

            fn delete_long_running_operation_state(
                &self,
                name: &str,
                service: &str,
                future_type: $crate::future::FutureType,
            ) {
                self.$store.delete_future(name, service, future_type);
            }

            fn timeouts(&self) -> $crate::config::Timeouts {
                self.timeouts
            }
        }

        impl $crate::scope::AsyncStatusUpdater for $scope {
            fn update_put_status(
                &self,
                condition_type: &str,
                service: &str,
                err: Option<&$crate::error::ReconcileError>,
            ) {
                tracing::debug!(
                    "Updating {} condition after put (service: {}, error: {:?})",
                    condition_type,
                    service,
                    err.map(|e| e.to_string())
                );
                self.$store
                    .set_condition($crate::conditions::put_condition(condition_type, err));
            }

            fn update_delete_status(
                &self,
                condition_type: &str,
                service: &str,
                err: Option<&$crate::error::ReconcileError>,
            ) {
                tracing::debug!(
                    "Updating {} condition after delete (service: {}, error: {:?})",
                    condition_type,
                    service,
                    err.map(|e| e.to_string())
                );
                self.$store
                    .set_condition($crate::conditions::delete_condition(condition_type, err));
            }
        }
    };
}

pub(crate) use impl_status_scope;
