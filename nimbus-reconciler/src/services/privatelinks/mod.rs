//! Private link services.

mod spec;

use std::sync::Arc;

use async_trait::async_trait;

pub use spec::{NatIpConfiguration, PrivateLinkSpec};

use super::{ServiceCore, ServiceReconciler, as_dyn_specs};
use crate::client::{ResourceClient, TagsGetter};
use crate::conditions::PRIVATE_LINKS_READY;
use crate::context::ReconcileContext;
use crate::error::Result;
use crate::scope::ServiceScope;

pub const SERVICE_NAME: &str = "privatelinks";

pub trait PrivateLinkScope: ServiceScope {
    fn private_link_specs(&self) -> Vec<PrivateLinkSpec>;
}

pub struct Service<S> {
    core: ServiceCore<S>,
}

impl<S: PrivateLinkScope + 'static> Service<S> {
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
impl<S: PrivateLinkScope + 'static> ServiceReconciler for Service<S> {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    async fn reconcile(&self, ctx: &ReconcileContext) -> Result<()> {
        let specs = self.core.scope.private_link_specs();
        if specs.is_empty() {
            return Ok(());
        }
        let ctx = self.core.service_context(ctx);
        self.core
            .reconcile_specs(&ctx, &as_dyn_specs(&specs), SERVICE_NAME, PRIVATE_LINKS_READY)
            .await
            .into_result()
    }

    async fn delete(&self, ctx: &ReconcileContext) -> Result<()> {
        let specs = self.core.scope.private_link_specs();
        if specs.is_empty() {
            return Ok(());
        }
        let ctx = self.core.service_context(ctx);
        self.core
            .delete_specs_with_status(&ctx, &as_dyn_specs(&specs), SERVICE_NAME, PRIVATE_LINKS_READY)
            .await
            .into_result()
    }
}
