use crate::error::Result;
use crate::models::{OrchestrationMode, Resource, ResourceKind};
use crate::resource_id::{self, parse_provider_id};
use crate::spec::ResourceSpec;

/// One machine-pool instance, in either orchestration mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleSetVmSpec {
    pub name: String,
    pub instance_id: String,
    pub vmss_name: String,
    pub resource_group: String,
    pub subscription_id: String,
    /// `azure:///<resource-id>`; addresses Flexible members.
    pub provider_id: String,
    pub orchestration_mode: OrchestrationMode,
}

impl ResourceSpec for ScaleSetVmSpec {
    /// Uniform instances are addressed by instance ID within the scale set.
    fn resource_name(&self) -> &str {
        &self.instance_id
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    fn owner_resource_name(&self) -> &str {
        &self.vmss_name
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::ScaleSetVm
    }

    fn resource_id(&self) -> String {
        resource_id::child_resource_id(
            &self.subscription_id,
            &self.resource_group,
            resource_id::VIRTUAL_MACHINE_SCALE_SETS,
            &self.vmss_name,
            "virtualMachines",
            &self.instance_id,
        )
    }

    /// Instances are mutated through the scale set model, never here.
    fn parameters(&self, _existing: Option<&Resource>) -> Result<Option<Resource>> {
        Ok(None)
    }
}

/// A Flexible scale-set member, addressed as a standalone VM.
#[derive(Debug, Clone, PartialEq)]
pub struct FlexVmSpec {
    pub name: String,
    pub resource_group: String,
    pub subscription_id: String,
}

impl FlexVmSpec {
    pub fn from_provider_id(provider_id: &str) -> Result<Self> {
        let id = parse_provider_id(provider_id)?;
        Ok(Self {
            name: id.name,
            resource_group: id.resource_group,
            subscription_id: id.subscription_id,
        })
    }
}

impl ResourceSpec for FlexVmSpec {
    fn resource_name(&self) -> &str {
        &self.name
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::VirtualMachine
    }

    fn resource_id(&self) -> String {
        resource_id::resource_id(
            &self.subscription_id,
            &self.resource_group,
            resource_id::VIRTUAL_MACHINES,
            &self.name,
        )
    }

    fn parameters(&self, _existing: Option<&Resource>) -> Result<Option<Resource>> {
        Ok(None)
    }
}
