//! Machine pool machine scope: one scale-set instance of a cluster.

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use super::{ClusterDescriber, ScopeStatus, StatusStore, impl_status_scope};
use crate::config::{ClusterConfig, Timeouts};
use crate::models::{OrchestrationMode, ProvisioningState, VmssVm};
use crate::services::scalesetvms::{ScaleSetVmScope, ScaleSetVmSpec};
use crate::tags::Tags;

/// Identity of the instance backing one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineRef {
    pub name: String,
    pub vmss_name: String,
    pub instance_id: String,
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub orchestration_mode: OrchestrationMode,
}

pub struct MachinePoolMachineScope {
    cluster: ClusterConfig,
    machine: MachineRef,
    status: StatusStore,
    timeouts: Timeouts,
    vmss_vm: RwLock<Option<VmssVm>>,
}

impl MachinePoolMachineScope {
    pub fn new(cluster: &ClusterConfig, machine: MachineRef) -> Self {
        Self::with_status(cluster, machine, ScopeStatus::default())
    }

    pub fn with_status(cluster: &ClusterConfig, machine: MachineRef, status: ScopeStatus) -> Self {
        Self {
            cluster: cluster.clone(),
            machine,
            status: StatusStore::from_status(status),
            timeouts: cluster.timeouts,
            vmss_vm: RwLock::new(None),
        }
    }

    pub fn machine(&self) -> &MachineRef {
        &self.machine
    }

    pub fn status(&self) -> ScopeStatus {
        self.status.snapshot()
    }

    /// Last published instance state.
    pub fn vmss_vm(&self) -> Option<VmssVm> {
        self.vmss_vm
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ClusterDescriber for MachinePoolMachineScope {
    fn subscription_id(&self) -> &str {
        &self.cluster.subscription_id
    }

    fn resource_group(&self) -> &str {
        &self.cluster.resource_group
    }

    fn location(&self) -> &str {
        &self.cluster.location
    }

    fn cluster_name(&self) -> &str {
        &self.cluster.cluster_name
    }

    fn additional_tags(&self) -> &Tags {
        &self.cluster.additional_tags
    }

    fn failure_domains(&self) -> &[String] {
        &self.cluster.failure_domains
    }
}

impl_status_scope!(MachinePoolMachineScope, status);

impl ScaleSetVmScope for MachinePoolMachineScope {
    fn scale_set_vm_spec(&self) -> ScaleSetVmSpec {
        ScaleSetVmSpec {
            name: self.machine.name.clone(),
            instance_id: self.machine.instance_id.clone(),
            vmss_name: self.machine.vmss_name.clone(),
            resource_group: self.cluster.resource_group.clone(),
            subscription_id: self.cluster.subscription_id.clone(),
            provider_id: self.machine.provider_id.clone(),
            orchestration_mode: self.machine.orchestration_mode,
        }
    }

    fn set_vmss_vm(&self, vm: VmssVm) {
        *self.vmss_vm.write().unwrap_or_else(PoisonError::into_inner) = Some(vm);
    }

    /// Tracks the state even before the instance was first observed.
    fn set_vmss_vm_state(&self, state: ProvisioningState) {
        let mut vm = self.vmss_vm.write().unwrap_or_else(PoisonError::into_inner);
        let vm = vm.get_or_insert_with(|| VmssVm {
            instance_id: self.machine.instance_id.clone(),
            name: self.machine.name.clone(),
            orchestration_mode: self.machine.orchestration_mode,
            ..Default::default()
        });
        vm.state = state;
    }
}
