use crate::error::{ReconcileError, Result};
use crate::merge::{merge_by_key, merge_by_name};
use crate::models::{
    IpAllocationMethod, PrivateLinkIpConfiguration, PrivateLinkService, Resource, ResourceKind,
    SubResource, downcast,
};
use crate::resource_id;
use crate::spec::ResourceSpec;
use crate::tags::{BuildParams, ResourceLifecycle, Tags, build_tags};

/// One NAT IP configuration of a private link, resolved to a subnet ID.
#[derive(Debug, Clone, PartialEq)]
pub struct NatIpConfiguration {
    pub subnet_name: String,
    pub subnet_id: String,
    pub private_ip_address: Option<String>,
}

/// Desired state of one private link service in front of a load balancer.
#[derive(Debug, Clone, PartialEq)]
pub struct PrivateLinkSpec {
    pub name: String,
    pub resource_group: String,
    pub subscription_id: String,
    pub cluster_name: String,
    pub location: String,
    /// IDs of the LB frontend IP configurations to expose.
    pub lb_frontend_ids: Vec<String>,
    pub nat_ip_configurations: Vec<NatIpConfiguration>,
    pub allowed_subscriptions: Vec<String>,
    pub auto_approved_subscriptions: Vec<String>,
    pub enable_proxy_protocol: Option<bool>,
    pub additional_tags: Tags,
}

impl PrivateLinkSpec {
    fn desired_ip_configurations(&self) -> Vec<PrivateLinkIpConfiguration> {
        self.nat_ip_configurations
            .iter()
            .enumerate()
            .map(|(i, nat)| PrivateLinkIpConfiguration {
                name: format!("{}-natipconfig-{}", nat.subnet_name, i + 1),
                subnet: SubResource::new(nat.subnet_id.clone()),
                private_ip_allocation_method: if nat.private_ip_address.is_some() {
                    IpAllocationMethod::Static
                } else {
                    IpAllocationMethod::Dynamic
                },
                private_ip_address: nat.private_ip_address.clone(),
                primary: i == 0,
            })
            .collect()
    }

    fn desired_frontends(&self) -> Vec<SubResource> {
        self.lb_frontend_ids
            .iter()
            .map(|id| SubResource::new(id.clone()))
            .collect()
    }
}

impl ResourceSpec for PrivateLinkSpec {
    fn resource_name(&self) -> &str {
        &self.name
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::PrivateLinkService
    }

    fn resource_id(&self) -> String {
        resource_id::resource_id(
            &self.subscription_id,
            &self.resource_group,
            resource_id::PRIVATE_LINK_SERVICES,
            &self.name,
        )
    }

    fn parameters(&self, existing: Option<&Resource>) -> Result<Option<Resource>> {
        if self.nat_ip_configurations.is_empty() {
            return Err(ReconcileError::Configuration(format!(
                "private link {} needs at least one NAT IP configuration",
                self.name
            )));
        }

        let desired_ips = self.desired_ip_configurations();
        let desired_frontends = self.desired_frontends();

        let Some(existing) = downcast::<PrivateLinkService>(existing)? else {
            return Ok(Some(
                PrivateLinkService {
                    id: None,
                    name: self.name.clone(),
                    location: Some(self.location.clone()),
                    etag: None,
                    tags: build_tags(BuildParams {
                        cluster_name: &self.cluster_name,
                        lifecycle: ResourceLifecycle::Owned,
                        name: Some(&self.name),
                        role: None,
                        additional: &self.additional_tags,
                    }),
                    load_balancer_frontend_ip_configurations: desired_frontends,
                    ip_configurations: desired_ips,
                    visibility: self.allowed_subscriptions.clone(),
                    auto_approval: self.auto_approved_subscriptions.clone(),
                    enable_proxy_protocol: self.enable_proxy_protocol,
                }
                .into(),
            ));
        };

        let (ip_configurations, ips_changed) =
            merge_by_name(&existing.ip_configurations, &desired_ips);
        let (frontends, frontends_changed) = merge_by_key(
            &existing.load_balancer_frontend_ip_configurations,
            &desired_frontends,
            |fe| fe.id.to_lowercase(),
        );
        let settings_changed = existing.visibility != self.allowed_subscriptions
            || existing.auto_approval != self.auto_approved_subscriptions
            || existing.enable_proxy_protocol != self.enable_proxy_protocol;

        if !ips_changed && !frontends_changed && !settings_changed {
            return Ok(None);
        }

        let mut updated = existing.clone();
        updated.ip_configurations = ip_configurations;
        updated.load_balancer_frontend_ip_configurations = frontends;
        updated.visibility = self.allowed_subscriptions.clone();
        updated.auto_approval = self.auto_approved_subscriptions.clone();
        updated.enable_proxy_protocol = self.enable_proxy_protocol;
        Ok(Some(updated.into()))
    }
}
