//! Scale-set VM instances.
//!
//! Reconcile only observes: it fetches the live instance and publishes it to
//! the machine pool scope. Delete goes through the regular long-running
//! operation protocol without an ownership check, since the machine pool
//! owns the instance by construction.

mod spec;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

pub use spec::{FlexVmSpec, ScaleSetVmSpec};

use super::{ServiceCore, ServiceReconciler};
use crate::client::ResourceClient;
use crate::context::ReconcileContext;
use crate::error::{ReconcileError, Result};
use crate::models::{OrchestrationMode, ProvisioningState, Resource, VmssVm};
use crate::scope::ServiceScope;
use crate::spec::ResourceSpec;

pub const SERVICE_NAME: &str = "scalesetvm";

pub trait ScaleSetVmScope: ServiceScope {
    fn scale_set_vm_spec(&self) -> ScaleSetVmSpec;

    /// Publish the observed instance.
    fn set_vmss_vm(&self, vm: VmssVm);

    fn set_vmss_vm_state(&self, state: ProvisioningState);
}

pub struct Service<S> {
    core: ServiceCore<S>,
}

/// The addressable spec for the configured orchestration mode.
enum Target {
    Uniform(ScaleSetVmSpec),
    Flexible(FlexVmSpec),
}

impl Target {
    fn spec(&self) -> &dyn ResourceSpec {
        match self {
            Target::Uniform(spec) => spec,
            Target::Flexible(spec) => spec,
        }
    }
}

impl<S: ScaleSetVmScope + 'static> Service<S> {
    pub fn new(scope: Arc<S>, client: Arc<dyn ResourceClient>) -> Self {
        Self {
            core: ServiceCore::new(scope, client),
        }
    }

    fn target(&self) -> Result<Target> {
        let spec = self.core.scope.scale_set_vm_spec();
        Ok(match spec.orchestration_mode {
            OrchestrationMode::Uniform => Target::Uniform(spec),
            OrchestrationMode::Flexible => {
                Target::Flexible(FlexVmSpec::from_provider_id(&spec.provider_id)?)
            }
        })
    }
}

#[async_trait]
impl<S: ScaleSetVmScope + 'static> ServiceReconciler for Service<S> {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    async fn reconcile(&self, ctx: &ReconcileContext) -> Result<()> {
        let ctx = self.core.service_context(ctx);
        let target = self.target()?;
        let spec = target.spec();

        let observed = self
            .core
            .reconciler()
            .create_or_update_resource(&ctx, spec, SERVICE_NAME)
            .await?;

        let vm = match observed {
            Some(Resource::ScaleSetVm(vm)) => VmssVm::from(&vm),
            Some(Resource::VirtualMachine(vm)) => VmssVm::from(&vm),
            Some(other) => {
                return Err(ReconcileError::TypeMismatch {
                    expected: spec.resource_kind().to_string(),
                    actual: other.kind().to_string(),
                });
            }
            None => {
                debug!(
                    "Instance {}/{} not found, nothing to publish",
                    spec.resource_group_name(),
                    spec.resource_name()
                );
                return Ok(());
            }
        };
        debug!("Publishing instance {} in state {}", vm.name, vm.state);
        self.core.scope.set_vmss_vm(vm);
        Ok(())
    }

    async fn delete(&self, ctx: &ReconcileContext) -> Result<()> {
        let ctx = self.core.service_context(ctx);
        let target = self.target()?;
        let spec = target.spec();

        match self
            .core
            .reconciler()
            .delete_resource(&ctx, spec, SERVICE_NAME)
            .await
        {
            Ok(()) => {
                info!(
                    "Deleted instance {}/{}",
                    spec.resource_group_name(),
                    spec.resource_name()
                );
                self.core.scope.set_vmss_vm_state(ProvisioningState::Deleted);
                Ok(())
            }
            Err(e) => {
                let state = if e.is_transient() {
                    ProvisioningState::Deleting
                } else {
                    ProvisioningState::Failed
                };
                self.core.scope.set_vmss_vm_state(state);
                Err(e)
            }
        }
    }
}
