//! Cluster scope: the per-cluster context shared by every network service.
//!
//! Built from a validated [`ClusterConfig`]. Specs are derived from the
//! configuration on every call, so values copied back after a vnet create
//! show up in the specs of services that run later in the same tick.

use std::collections::HashSet;
use std::sync::{OnceLock, PoisonError, RwLock};

use super::{ClusterDescriber, ScopeStatus, StatusStore, impl_status_scope};
use crate::config::{
    ClusterConfig, LbRole, LoadBalancerConfig, NetworkConfig, PublicIpConfig, Timeouts,
};
use crate::resource_id;
use crate::services::bastionhosts::{BastionScope, BastionSpec};
use crate::services::loadbalancers::{LbSpec, LoadBalancerScope};
use crate::services::privatedns::{
    PrivateDnsScope, PrivateDnsSpec, PrivateDnsZoneSpec, RecordSpec, VnetLinkSpec,
};
use crate::services::privatelinks::{NatIpConfiguration, PrivateLinkScope, PrivateLinkSpec};
use crate::services::publicips::{PublicIpScope, PublicIpSpec};
use crate::services::routetables::{RouteTableScope, RouteTableSpec};
use crate::services::virtualnetworks::{VnetScope, VnetSpec};
use crate::tags::Tags;

/// Relative name of the API server record in the private DNS zone.
pub const API_SERVER_RECORD_NAME: &str = "apiserver";

pub struct ClusterScope {
    config: ClusterConfig,
    network: RwLock<NetworkConfig>,
    status: StatusStore,
    timeouts: Timeouts,
    vnet_managed: OnceLock<bool>,
}

impl ClusterScope {
    pub fn new(config: ClusterConfig) -> Self {
        Self::with_status(config, ScopeStatus::default())
    }

    /// Rehydrate a scope from persisted status.
    pub fn with_status(config: ClusterConfig, status: ScopeStatus) -> Self {
        Self {
            network: RwLock::new(config.network.clone()),
            timeouts: config.timeouts,
            status: StatusStore::from_status(status),
            vnet_managed: OnceLock::new(),
            config,
        }
    }

    /// Snapshot of futures and conditions, for persisting.
    pub fn status(&self) -> ScopeStatus {
        self.status.snapshot()
    }

    /// Current network configuration, including copied-back values.
    pub fn network(&self) -> NetworkConfig {
        self.network
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn vnet_resource_group(&self, network: &NetworkConfig) -> String {
        network
            .vnet
            .resource_group
            .clone()
            .unwrap_or_else(|| self.config.resource_group.clone())
    }

    fn vnet_id(&self, network: &NetworkConfig) -> String {
        network.vnet.id.clone().unwrap_or_else(|| {
            resource_id::vnet_id(
                &self.config.subscription_id,
                &self.vnet_resource_group(network),
                &network.vnet.name,
            )
        })
    }

    fn subnet_id(&self, network: &NetworkConfig, subnet: &str) -> String {
        resource_id::subnet_id(
            &self.config.subscription_id,
            &self.vnet_resource_group(network),
            &network.vnet.name,
            subnet,
        )
    }

    fn load_balancers(network: &NetworkConfig) -> Vec<(LbRole, &LoadBalancerConfig)> {
        [
            (LbRole::APIServer, &network.api_server_lb),
            (LbRole::NodeOutbound, &network.node_outbound_lb),
            (LbRole::ControlPlaneOutbound, &network.control_plane_outbound_lb),
        ]
        .into_iter()
        .filter_map(|(role, lb)| lb.as_ref().map(|lb| (role, lb)))
        .collect()
    }

    fn public_ip_spec(&self, pip: &PublicIpConfig) -> PublicIpSpec {
        PublicIpSpec {
            name: pip.name.clone(),
            resource_group: self.config.resource_group.clone(),
            subscription_id: self.config.subscription_id.clone(),
            cluster_name: self.config.cluster_name.clone(),
            location: self.config.location.clone(),
            dns_name: pip.dns_name.clone(),
            is_ipv6: pip.is_ipv6,
            ip_tags: pip.ip_tags.clone(),
            failure_domains: self.config.failure_domains.clone(),
            additional_tags: self.config.additional_tags.clone(),
        }
    }
}

impl ClusterDescriber for ClusterScope {
    fn subscription_id(&self) -> &str {
        &self.config.subscription_id
    }

    fn resource_group(&self) -> &str {
        &self.config.resource_group
    }

    fn location(&self) -> &str {
        &self.config.location
    }

    fn cluster_name(&self) -> &str {
        &self.config.cluster_name
    }

    fn additional_tags(&self) -> &Tags {
        &self.config.additional_tags
    }

    fn failure_domains(&self) -> &[String] {
        &self.config.failure_domains
    }
}

impl_status_scope!(ClusterScope, status);

// =============================================================================
// Per-service scopes
// =============================================================================

impl VnetScope for ClusterScope {
    fn vnet_spec(&self) -> VnetSpec {
        let network = self.network();
        VnetSpec {
            name: network.vnet.name.clone(),
            resource_group: self.vnet_resource_group(&network),
            subscription_id: self.config.subscription_id.clone(),
            cluster_name: self.config.cluster_name.clone(),
            location: self.config.location.clone(),
            cidrs: network.vnet.cidr_blocks.clone(),
            additional_tags: self.config.additional_tags.merge(&network.vnet.tags),
            subnets: network.subnets,
        }
    }

    fn is_vnet_managed_cached(&self) -> Option<bool> {
        self.vnet_managed.get().copied()
    }

    fn set_vnet_managed(&self, managed: bool) {
        let _ = self.vnet_managed.set(managed);
    }

    fn update_vnet(&self, id: Option<String>, tags: Tags, cidr_blocks: Vec<String>) {
        let mut network = self.network.write().unwrap_or_else(PoisonError::into_inner);
        if id.is_some() {
            network.vnet.id = id;
        }
        network.vnet.tags = tags;
        if !cidr_blocks.is_empty() {
            network.vnet.cidr_blocks = cidr_blocks;
        }
    }

    fn update_subnet_cidrs(&self, subnet: &str, cidr_blocks: Vec<String>) {
        let mut network = self.network.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(config) = network.subnets.iter_mut().find(|s| s.name == subnet) {
            config.cidr_blocks = cidr_blocks;
        }
    }
}

impl RouteTableScope for ClusterScope {
    fn route_table_specs(&self) -> Vec<RouteTableSpec> {
        let network = self.network();
        let resource_group = self.vnet_resource_group(&network);
        let mut seen = HashSet::new();
        network
            .subnets
            .iter()
            .filter_map(|subnet| subnet.route_table.clone())
            .filter(|name| seen.insert(name.clone()))
            .map(|name| RouteTableSpec {
                name,
                resource_group: resource_group.clone(),
                subscription_id: self.config.subscription_id.clone(),
                cluster_name: self.config.cluster_name.clone(),
                location: self.config.location.clone(),
                additional_tags: self.config.additional_tags.clone(),
            })
            .collect()
    }
}

impl PublicIpScope for ClusterScope {
    fn public_ip_specs(&self) -> Vec<PublicIpSpec> {
        let network = self.network();
        let lb_ips = Self::load_balancers(&network)
            .into_iter()
            .flat_map(|(_, lb)| lb.frontend_ips.iter())
            .filter_map(|fe| fe.public_ip.as_ref());
        let bastion_ip = self.config.bastion.as_ref().map(|b| &b.public_ip);

        let mut seen = HashSet::new();
        lb_ips
            .chain(bastion_ip)
            .filter(|pip| seen.insert(pip.name.clone()))
            .map(|pip| self.public_ip_spec(pip))
            .collect()
    }
}

impl LoadBalancerScope for ClusterScope {
    fn lb_specs(&self) -> Vec<LbSpec> {
        let network = self.network();
        let vnet_resource_group = self.vnet_resource_group(&network);
        Self::load_balancers(&network)
            .into_iter()
            .map(|(role, lb)| LbSpec {
                name: lb.name.clone(),
                resource_group: self.config.resource_group.clone(),
                subscription_id: self.config.subscription_id.clone(),
                cluster_name: self.config.cluster_name.clone(),
                location: self.config.location.clone(),
                role,
                lb_type: lb.lb_type,
                sku: lb.sku,
                vnet_name: network.vnet.name.clone(),
                vnet_resource_group: vnet_resource_group.clone(),
                subnet_name: lb.subnet_name.clone(),
                frontend_ip_configs: lb.frontend_ips.clone(),
                backend_pool_name: lb.backend_pool_name(),
                api_server_port: self.config.api_server_port(),
                additional_ports: lb.additional_ports.clone(),
                idle_timeout_in_minutes: lb.idle_timeout_in_minutes(),
                additional_tags: self.config.additional_tags.clone(),
            })
            .collect()
    }
}

impl PrivateDnsScope for ClusterScope {
    fn private_dns_spec(&self) -> Option<PrivateDnsSpec> {
        let network = self.network();
        let zone_name = network.private_dns_zone_name.clone()?;

        let zone = PrivateDnsZoneSpec {
            name: zone_name.clone(),
            resource_group: self.config.resource_group.clone(),
            subscription_id: self.config.subscription_id.clone(),
            cluster_name: self.config.cluster_name.clone(),
            additional_tags: self.config.additional_tags.clone(),
        };

        let link = |vnet_name: &str, vnet_id: String| VnetLinkSpec {
            name: format!("{}-link", vnet_name),
            zone_name: zone_name.clone(),
            resource_group: self.config.resource_group.clone(),
            subscription_id: self.config.subscription_id.clone(),
            vnet_id,
            cluster_name: self.config.cluster_name.clone(),
            additional_tags: self.config.additional_tags.clone(),
        };
        let mut links = vec![link(&network.vnet.name, self.vnet_id(&network))];
        for extra in &network.additional_dns_vnet_links {
            let subscription_id = extra
                .subscription_id
                .as_deref()
                .unwrap_or(&self.config.subscription_id);
            links.push(link(
                &extra.vnet_name,
                resource_id::vnet_id(subscription_id, &extra.vnet_resource_group, &extra.vnet_name),
            ));
        }

        let records = network
            .api_server_lb
            .as_ref()
            .and_then(|lb| lb.frontend_ips.first())
            .and_then(|fe| fe.private_ip_address.clone())
            .map(|ip| RecordSpec {
                hostname: API_SERVER_RECORD_NAME.to_string(),
                ip,
                zone_name: zone_name.clone(),
                resource_group: self.config.resource_group.clone(),
                subscription_id: self.config.subscription_id.clone(),
            })
            .into_iter()
            .collect();

        Some(PrivateDnsSpec {
            zone,
            links,
            records,
        })
    }
}

impl BastionScope for ClusterScope {
    fn bastion_specs(&self) -> Vec<BastionSpec> {
        let Some(bastion) = &self.config.bastion else {
            return Vec::new();
        };
        let network = self.network();
        vec![BastionSpec {
            name: bastion.name.clone(),
            resource_group: self.config.resource_group.clone(),
            subscription_id: self.config.subscription_id.clone(),
            cluster_name: self.config.cluster_name.clone(),
            location: self.config.location.clone(),
            subnet_id: self.subnet_id(&network, &bastion.subnet_name),
            public_ip_id: resource_id::public_ip_id(
                &self.config.subscription_id,
                &self.config.resource_group,
                &bastion.public_ip.name,
            ),
            sku: bastion.sku,
            enable_tunneling: bastion.enable_tunneling,
            additional_tags: self.config.additional_tags.clone(),
        }]
    }
}

impl PrivateLinkScope for ClusterScope {
    fn private_link_specs(&self) -> Vec<PrivateLinkSpec> {
        let network = self.network();
        let lbs = Self::load_balancers(&network);
        self.config
            .private_links
            .iter()
            .map(|link| {
                let lb_frontend_ids = lbs
                    .iter()
                    .find(|(_, lb)| lb.name == link.lb_name)
                    .map(|(_, lb)| {
                        lb.frontend_ips
                            .iter()
                            .map(|fe| {
                                resource_id::frontend_ip_config_id(
                                    &self.config.subscription_id,
                                    &self.config.resource_group,
                                    &lb.name,
                                    &fe.name,
                                )
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                PrivateLinkSpec {
                    name: link.name.clone(),
                    resource_group: self.config.resource_group.clone(),
                    subscription_id: self.config.subscription_id.clone(),
                    cluster_name: self.config.cluster_name.clone(),
                    location: self.config.location.clone(),
                    lb_frontend_ids,
                    nat_ip_configurations: link
                        .nat_ip_configurations
                        .iter()
                        .map(|nat| NatIpConfiguration {
                            subnet_name: nat.subnet_name.clone(),
                            subnet_id: self.subnet_id(&network, &nat.subnet_name),
                            private_ip_address: nat.private_ip_address.clone(),
                        })
                        .collect(),
                    allowed_subscriptions: link.allowed_subscriptions.clone(),
                    auto_approved_subscriptions: link.auto_approved_subscriptions.clone(),
                    enable_proxy_protocol: link.enable_proxy_protocol,
                    additional_tags: self.config.additional_tags.clone(),
                }
            })
            .collect()
    }
}
