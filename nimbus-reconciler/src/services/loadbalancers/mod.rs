//! Load balancers.

mod spec;

use std::sync::Arc;

use async_trait::async_trait;

pub use spec::{HTTPS_PROBE, LB_RULE_HTTPS, LbSpec, OUTBOUND_NAT_ALL_PROTOCOLS};

use super::{ServiceCore, ServiceReconciler, as_dyn_specs};
use crate::client::{ResourceClient, TagsGetter};
use crate::conditions::LOAD_BALANCERS_READY;
use crate::context::ReconcileContext;
use crate::error::Result;
use crate::scope::ServiceScope;

pub const SERVICE_NAME: &str = "loadbalancers";

pub trait LoadBalancerScope: ServiceScope {
    fn lb_specs(&self) -> Vec<LbSpec>;
}

pub struct Service<S> {
    core: ServiceCore<S>,
}

impl<S: LoadBalancerScope + 'static> Service<S> {
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
impl<S: LoadBalancerScope + 'static> ServiceReconciler for Service<S> {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    async fn reconcile(&self, ctx: &ReconcileContext) -> Result<()> {
        let ctx = self.core.service_context(ctx);
        let specs = self.core.scope.lb_specs();
        self.core
            .reconcile_specs(&ctx, &as_dyn_specs(&specs), SERVICE_NAME, LOAD_BALANCERS_READY)
            .await
            .into_result()
    }

    async fn delete(&self, ctx: &ReconcileContext) -> Result<()> {
        let ctx = self.core.service_context(ctx);
        let specs = self.core.scope.lb_specs();
        self.core
            .delete_specs_with_status(&ctx, &as_dyn_specs(&specs), SERVICE_NAME, LOAD_BALANCERS_READY)
            .await
            .into_result()
    }
}
