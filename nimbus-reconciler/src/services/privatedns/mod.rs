//! Private DNS: zone, vnet links and records.
//!
//! The three tiers are reconciled in order (zone, links, records) and each
//! reports its own condition. A zone or link that exists without the
//! cluster ownership tag was brought by the user and is left alone. Delete
//! runs links first, then the zone; records go away with their zone.

mod spec;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

pub use spec::{PrivateDnsSpec, PrivateDnsZoneSpec, RECORD_TTL_SECS, RecordSpec, VnetLinkSpec};

use super::{Ownership, ServiceCore, ServiceReconciler, as_dyn_specs};
use crate::client::{ResourceClient, TagsGetter};
use crate::conditions::{PRIVATE_DNS_LINK_READY, PRIVATE_DNS_RECORD_READY, PRIVATE_DNS_ZONE_READY};
use crate::context::ReconcileContext;
use crate::error::{ErrorAggregate, Result};
use crate::scope::ServiceScope;
use crate::spec::ResourceSpec;

pub const SERVICE_NAME: &str = "privatedns";
pub const ZONE_SERVICE_NAME: &str = "privatednszone";
pub const LINK_SERVICE_NAME: &str = "privatednslink";
pub const RECORD_SERVICE_NAME: &str = "privatednsrecord";

pub trait PrivateDnsScope: ServiceScope {
    /// `None` when the cluster has no private DNS zone.
    fn private_dns_spec(&self) -> Option<PrivateDnsSpec>;
}

pub struct Service<S> {
    core: ServiceCore<S>,
}

impl<S: PrivateDnsScope + 'static> Service<S> {
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

    /// Owned or not yet created.
    async fn is_managed(&self, ctx: &ReconcileContext, spec: &dyn ResourceSpec) -> Result<bool> {
        Ok(matches!(
            self.core.ownership(ctx, spec).await?,
            Ownership::Owned | Ownership::Missing
        ))
    }

    async fn reconcile_zone(&self, ctx: &ReconcileContext, zone: &PrivateDnsZoneSpec) -> Result<()> {
        if !self.is_managed(ctx, zone).await? {
            info!(
                "Skipping reconcile of unmanaged private DNS zone {}/{}",
                zone.resource_group, zone.name
            );
            return Ok(());
        }
        let result = self
            .core
            .reconciler()
            .create_or_update_resource(ctx, zone, ZONE_SERVICE_NAME)
            .await
            .map(|_| ());
        self.core
            .scope
            .update_put_status(PRIVATE_DNS_ZONE_READY, ZONE_SERVICE_NAME, result.as_ref().err());
        result
    }

    async fn reconcile_links(&self, ctx: &ReconcileContext, links: &[VnetLinkSpec]) -> Result<()> {
        let mut errors = ErrorAggregate::new();
        let mut any_managed = false;

        for link in links {
            match self.is_managed(ctx, link).await {
                Ok(true) => {
                    any_managed = true;
                    errors.record(
                        self.core
                            .reconciler()
                            .create_or_update_resource(ctx, link, LINK_SERVICE_NAME)
                            .await,
                    );
                }
                Ok(false) => {
                    debug!(
                        "Skipping reconcile of unmanaged vnet link {} in zone {}",
                        link.name, link.zone_name
                    );
                }
                Err(e) => {
                    any_managed = true;
                    errors.record::<()>(Err(e));
                }
            }
        }

        if any_managed {
            self.core
                .scope
                .update_put_status(PRIVATE_DNS_LINK_READY, LINK_SERVICE_NAME, errors.error());
        }
        errors.into_result()
    }
}

#[async_trait]
impl<S: PrivateDnsScope + 'static> ServiceReconciler for Service<S> {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    async fn reconcile(&self, ctx: &ReconcileContext) -> Result<()> {
        let Some(spec) = self.core.scope.private_dns_spec() else {
            debug!("No private DNS zone configured");
            return Ok(());
        };
        let ctx = self.core.service_context(ctx);

        self.reconcile_zone(&ctx, &spec.zone).await?;
        self.reconcile_links(&ctx, &spec.links).await?;

        self.core
            .reconcile_specs(
                &ctx,
                &as_dyn_specs(&spec.records),
                RECORD_SERVICE_NAME,
                PRIVATE_DNS_RECORD_READY,
            )
            .await
            .into_result()
    }

    async fn delete(&self, ctx: &ReconcileContext) -> Result<()> {
        let Some(spec) = self.core.scope.private_dns_spec() else {
            return Ok(());
        };
        let ctx = self.core.service_context(ctx);

        let links = self
            .core
            .delete_specs(&ctx, &as_dyn_specs(&spec.links), LINK_SERVICE_NAME)
            .await;
        if links.touched && !spec.links.is_empty() {
            self.core.scope.update_delete_status(
                PRIVATE_DNS_LINK_READY,
                LINK_SERVICE_NAME,
                links.error.as_ref(),
            );
        }
        links.into_result()?;

        let (acted, result) = self
            .core
            .delete_if_owned(&ctx, &spec.zone, ZONE_SERVICE_NAME)
            .await;
        if acted {
            let err = result.as_ref().err();
            self.core
                .scope
                .update_delete_status(PRIVATE_DNS_ZONE_READY, ZONE_SERVICE_NAME, err);
            // Records are removed with their zone.
            self.core
                .scope
                .update_delete_status(PRIVATE_DNS_RECORD_READY, RECORD_SERVICE_NAME, err);
        }
        result
    }
}
