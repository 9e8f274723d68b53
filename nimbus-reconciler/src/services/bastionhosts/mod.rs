//! Bastion hosts.

mod spec;

use std::sync::Arc;

use async_trait::async_trait;

pub use spec::BastionSpec;

use super::{ServiceCore, ServiceReconciler, as_dyn_specs};
use crate::client::{ResourceClient, TagsGetter};
use crate::conditions::BASTION_HOST_READY;
use crate::context::ReconcileContext;
use crate::error::Result;
use crate::scope::ServiceScope;

pub const SERVICE_NAME: &str = "bastionhosts";

pub trait BastionScope: ServiceScope {
    fn bastion_specs(&self) -> Vec<BastionSpec>;
}

pub struct Service<S> {
    core: ServiceCore<S>,
}

impl<S: BastionScope + 'static> Service<S> {
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
}

#[async_trait]
impl<S: BastionScope + 'static> ServiceReconciler for Service<S> {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    async fn reconcile(&self, ctx: &ReconcileContext) -> Result<()> {
        let specs = self.core.scope.bastion_specs();
        if specs.is_empty() {
            return Ok(());
        }
        let ctx = self.core.service_context(ctx);
        self.core
            .reconcile_specs(&ctx, &as_dyn_specs(&specs), SERVICE_NAME, BASTION_HOST_READY)
            .await
            .into_result()
    }

    async fn delete(&self, ctx: &ReconcileContext) -> Result<()> {
        let specs = self.core.scope.bastion_specs();
        if specs.is_empty() {
            return Ok(());
        }
        let ctx = self.core.service_context(ctx);
        self.core
            .delete_specs_with_status(&ctx, &as_dyn_specs(&specs), SERVICE_NAME, BASTION_HOST_READY)
            .await
            .into_result()
    }
}
