//! Subnet route tables.
//!
//! Route tables are only managed together with the vnet. When the cluster
//! runs on a vnet it does not own, both reconcile and delete are no-ops and
//! no condition is written.

mod spec;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

pub use spec::RouteTableSpec;

use super::virtualnetworks::VnetManagedChecker;
use super::{ServiceCore, ServiceReconciler, as_dyn_specs};
use crate::client::{ResourceClient, TagsGetter};
use crate::conditions::ROUTE_TABLES_READY;
use crate::context::ReconcileContext;
use crate::error::Result;
use crate::scope::ServiceScope;

pub const SERVICE_NAME: &str = "routetables";

pub trait RouteTableScope: ServiceScope {
    fn route_table_specs(&self) -> Vec<RouteTableSpec>;
}

pub struct Service<S> {
    core: ServiceCore<S>,
    vnet: Arc<dyn VnetManagedChecker>,
}

impl<S: RouteTableScope + 'static> Service<S> {
    pub fn new(
        scope: Arc<S>,
        client: Arc<dyn ResourceClient>,
        vnet: Arc<dyn VnetManagedChecker>,
    ) -> Self {
        Self {
            core: ServiceCore::new(scope, client),
            vnet,
        }
    }

    pub fn with_tags_getter(self, tags_getter: Arc<dyn TagsGetter>) -> Self {
        Self {
            core: self.core.with_tags_getter(tags_getter),
            vnet: self.vnet,
        }
    }
}

#[async_trait]
impl<S: RouteTableScope + 'static> ServiceReconciler for Service<S> {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    async fn reconcile(&self, ctx: &ReconcileContext) -> Result<()> {
        let ctx = self.core.service_context(ctx);
        if !self.vnet.is_managed(&ctx).await? {
            debug!("Skipping route table reconcile in custom vnet mode");
            return Ok(());
        }
        let specs = self.core.scope.route_table_specs();
        self.core
            .reconcile_specs(&ctx, &as_dyn_specs(&specs), SERVICE_NAME, ROUTE_TABLES_READY)
            .await
            .into_result()
    }

    async fn delete(&self, ctx: &ReconcileContext) -> Result<()> {
        let ctx = self.core.service_context(ctx);
        if !self.vnet.is_managed(&ctx).await? {
            debug!("Skipping route table delete in custom vnet mode");
            return Ok(());
        }
        let specs = self.core.scope.route_table_specs();
        self.core
            .delete_specs_with_status(&ctx, &as_dyn_specs(&specs), SERVICE_NAME, ROUTE_TABLES_READY)
            .await
            .into_result()
    }
}
