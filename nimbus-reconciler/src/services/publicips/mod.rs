//! Public IP addresses.

mod spec;

use std::sync::Arc;

use async_trait::async_trait;

pub use spec::PublicIpSpec;

use super::{ServiceCore, ServiceReconciler, as_dyn_specs};
use crate::client::{ResourceClient, TagsGetter};
use crate::conditions::PUBLIC_IPS_READY;
use crate::context::ReconcileContext;
use crate::error::Result;
use crate::scope::ServiceScope;

pub const SERVICE_NAME: &str = "publicips";

pub trait PublicIpScope: ServiceScope {
    fn public_ip_specs(&self) -> Vec<PublicIpSpec>;
}

pub struct Service<S> {
    core: ServiceCore<S>,
}

impl<S: PublicIpScope + 'static> Service<S> {
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
impl<S: PublicIpScope + 'static> ServiceReconciler for Service<S> {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    async fn reconcile(&self, ctx: &ReconcileContext) -> Result<()> {
        let ctx = self.core.service_context(ctx);
        let specs = self.core.scope.public_ip_specs();
        self.core
            .reconcile_specs(&ctx, &as_dyn_specs(&specs), SERVICE_NAME, PUBLIC_IPS_READY)
            .await
            .into_result()
    }

    async fn delete(&self, ctx: &ReconcileContext) -> Result<()> {
        let ctx = self.core.service_context(ctx);
        let specs = self.core.scope.public_ip_specs();
        self.core
            .delete_specs_with_status(&ctx, &as_dyn_specs(&specs), SERVICE_NAME, PUBLIC_IPS_READY)
            .await
            .into_result()
    }
}
