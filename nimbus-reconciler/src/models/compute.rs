//! Compute entities: scale-set instances and the VM snapshot published to the
//! machine pool.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tags::Tags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrchestrationMode {
    #[default]
    Uniform,
    Flexible,
}

/// Vendor provisioning state of a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProvisioningState {
    Creating,
    Updating,
    Succeeded,
    Failed,
    Deleting,
    Deleted,
    #[default]
    Unknown,
}

impl ProvisioningState {
    /// Parse the vendor string; unrecognized values map to `Unknown`.
    pub fn parse(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "creating" => ProvisioningState::Creating,
            "updating" => ProvisioningState::Updating,
            "succeeded" => ProvisioningState::Succeeded,
            "failed" => ProvisioningState::Failed,
            "deleting" => ProvisioningState::Deleting,
            "deleted" => ProvisioningState::Deleted,
            _ => ProvisioningState::Unknown,
        }
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisioningState::Creating => "Creating",
            ProvisioningState::Updating => "Updating",
            ProvisioningState::Succeeded => "Succeeded",
            ProvisioningState::Failed => "Failed",
            ProvisioningState::Deleting => "Deleting",
            ProvisioningState::Deleted => "Deleted",
            ProvisioningState::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// An instance of a Uniform scale set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScaleSetVm {
    pub id: Option<String>,
    pub name: String,
    pub instance_id: String,
    pub location: Option<String>,
    pub etag: Option<String>,
    pub tags: Tags,
    pub zones: Vec<String>,
    pub provisioning_state: Option<String>,
    pub latest_model_applied: bool,
}

/// A standalone VM; members of Flexible scale sets are addressed this way.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualMachine {
    pub id: Option<String>,
    pub name: String,
    pub location: Option<String>,
    pub etag: Option<String>,
    pub tags: Tags,
    pub zones: Vec<String>,
    pub provisioning_state: Option<String>,
}

/// Observed VM state handed back to the machine pool controller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmssVm {
    pub id: String,
    pub instance_id: String,
    pub name: String,
    pub availability_zone: String,
    pub state: ProvisioningState,
    pub latest_model_applied: bool,
    pub orchestration_mode: OrchestrationMode,
}

impl From<&ScaleSetVm> for VmssVm {
    fn from(vm: &ScaleSetVm) -> Self {
        Self {
            id: vm.id.clone().unwrap_or_default(),
            instance_id: vm.instance_id.clone(),
            name: vm.name.clone(),
            availability_zone: vm.zones.first().cloned().unwrap_or_default(),
            state: vm
                .provisioning_state
                .as_deref()
                .map(ProvisioningState::parse)
                .unwrap_or_default(),
            latest_model_applied: vm.latest_model_applied,
            orchestration_mode: OrchestrationMode::Uniform,
        }
    }
}

impl From<&VirtualMachine> for VmssVm {
    fn from(vm: &VirtualMachine) -> Self {
        Self {
            id: vm.id.clone().unwrap_or_default(),
            instance_id: String::new(),
            name: vm.name.clone(),
            availability_zone: vm.zones.first().cloned().unwrap_or_default(),
            state: vm
                .provisioning_state
                .as_deref()
                .map(ProvisioningState::parse)
                .unwrap_or_default(),
            // Flex members are updated individually and never lag a model.
            latest_model_applied: true,
            orchestration_mode: OrchestrationMode::Flexible,
        }
    }
}
