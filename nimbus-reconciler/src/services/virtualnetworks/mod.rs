//! Virtual networks.
//!
//! After a successful reconcile the live vnet's ID, tags, address prefixes
//! and subnet CIDRs are copied back into the scope so later services see
//! vendor-assigned values. The service also answers whether the vnet is
//! managed by this cluster, which route tables depend on.

mod spec;

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::{debug, info};

pub use spec::VnetSpec;

use super::{Ownership, ServiceCore, ServiceReconciler};
use crate::client::{ResourceClient, TagsGetter};
use crate::conditions::VNET_READY;
use crate::context::ReconcileContext;
use crate::error::Result;
use crate::models::{Resource, VirtualNetwork};
use crate::scope::ServiceScope;
use crate::tags::Tags;

pub const SERVICE_NAME: &str = "virtualnetwork";

pub trait VnetScope: ServiceScope {
    fn vnet_spec(&self) -> VnetSpec;

    /// Cached managed-ness of the vnet, once resolved.
    fn is_vnet_managed_cached(&self) -> Option<bool>;

    /// Record managed-ness; only the first write sticks.
    fn set_vnet_managed(&self, managed: bool);

    fn update_vnet(&self, id: Option<String>, tags: Tags, cidr_blocks: Vec<String>);

    fn update_subnet_cidrs(&self, subnet: &str, cidr_blocks: Vec<String>);
}

/// Answers whether the cluster vnet is managed by this cluster.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VnetManagedChecker: Send + Sync {
    async fn is_managed(&self, ctx: &ReconcileContext) -> Result<bool>;
}

pub struct Service<S> {
    core: ServiceCore<S>,
}

impl<S: VnetScope + 'static> Service<S> {
    pub fn new(scope: Arc<S>, client: Arc<dyn ResourceClient>) -> Self {
        Self {
            core: ServiceCore::new(scope, client),
        }
    }

    pub fn with_tags_getter(self, tags_getter: Arc<dyn TagsGetter>) -> Self {
        Self {
            core: self.core.with_tags_getter(tags_getter),
        }
    }

    fn copy_back(&self, vnet: &VirtualNetwork) {
        let scope = &self.core.scope;
        scope.update_vnet(vnet.id.clone(), vnet.tags.clone(), vnet.address_prefixes.clone());
        for subnet in &vnet.subnets {
            scope.update_subnet_cidrs(&subnet.name, subnet.address_prefixes.clone());
        }
    }
}

#[async_trait]
impl<S: VnetScope + 'static> VnetManagedChecker for Service<S> {
    /// Resolve once per scope. A vnet that does not exist yet is managed:
    /// this cluster is about to create it.
    async fn is_managed(&self, ctx: &ReconcileContext) -> Result<bool> {
        if let Some(managed) = self.core.scope.is_vnet_managed_cached() {
            return Ok(managed);
        }
        let spec = self.core.scope.vnet_spec();
        let managed = match self.core.ownership(ctx, &spec).await? {
            Ownership::Owned | Ownership::Missing => true,
            Ownership::Unmanaged => false,
        };
        debug!("Vnet {}/{} managed: {}", spec.resource_group, spec.name, managed);
        self.core.scope.set_vnet_managed(managed);
        Ok(self.core.scope.is_vnet_managed_cached().unwrap_or(managed))
    }
}

#[async_trait]
impl<S: VnetScope + 'static> ServiceReconciler for Service<S> {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    async fn reconcile(&self, ctx: &ReconcileContext) -> Result<()> {
        let ctx = self.core.service_context(ctx);
        let spec = self.core.scope.vnet_spec();
        let result = self
            .core
            .reconciler()
            .create_or_update_resource(&ctx, &spec, SERVICE_NAME)
            .await;
        self.core
            .scope
            .update_put_status(VNET_READY, SERVICE_NAME, result.as_ref().err());

        if let Some(Resource::VirtualNetwork(vnet)) = result? {
            self.copy_back(&vnet);
        }
        Ok(())
    }

    async fn delete(&self, ctx: &ReconcileContext) -> Result<()> {
        let ctx = self.core.service_context(ctx);
        let spec = self.core.scope.vnet_spec();
        let (acted, result) = self.core.delete_if_owned(&ctx, &spec, SERVICE_NAME).await;
        if !acted {
            info!("Skipping vnet deletion in custom vnet mode");
            return Ok(());
        }
        self.core
            .scope
            .update_delete_status(VNET_READY, SERVICE_NAME, result.as_ref().err());
        result
    }
}
