//! Configuration for a cluster scope.
//!
//! [`ClusterConfig`] describes the desired network infrastructure of one
//! cluster. It is deserialized from JSON (camelCase keys) and validated once
//! before a scope is built from it; the scope then derives every resource
//! spec from it.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result};
use crate::models::IpTag;
use crate::tags::Tags;

/// Default budget for a single vendor call.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 2;
/// Default budget for one service reconcile.
pub const DEFAULT_SERVICE_RECONCILE_TIMEOUT_SECS: u64 = 12;
/// Default requeue hint for in-flight operations.
pub const DEFAULT_REQUEUE_AFTER_SECS: u64 = 15;

/// Default API server port.
pub const DEFAULT_API_SERVER_PORT: u16 = 6443;
/// Default LB idle timeout.
pub const DEFAULT_IDLE_TIMEOUT_IN_MINUTES: i32 = 4;
/// Subnet name vendors require for bastion hosts.
pub const DEFAULT_BASTION_SUBNET_NAME: &str = "AzureBastionSubnet";

/// Timeouts applied by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timeouts {
    pub call_timeout_secs: u64,
    pub service_reconcile_timeout_secs: u64,
    pub requeue_after_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            service_reconcile_timeout_secs: DEFAULT_SERVICE_RECONCILE_TIMEOUT_SECS,
            requeue_after_secs: DEFAULT_REQUEUE_AFTER_SECS,
        }
    }
}

impl Timeouts {
    pub fn call(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn service_reconcile(&self) -> Duration {
        Duration::from_secs(self.service_reconcile_timeout_secs)
    }

    pub fn requeue_after(&self) -> Duration {
        Duration::from_secs(self.requeue_after_secs)
    }
}

// =============================================================================
// Load balancer configuration
// =============================================================================

/// Which rule template a load balancer gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LbRole {
    APIServer,
    NodeOutbound,
    ControlPlaneOutbound,
}

/// Frontend wiring of a load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LbType {
    Public,
    Internal,
}

/// Vendor product tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LbSku {
    #[default]
    Standard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpConfig {
    pub name: String,
    #[serde(default)]
    pub dns_name: Option<String>,
    #[serde(default)]
    pub ip_tags: Vec<IpTag>,
    #[serde(default)]
    pub is_ipv6: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendIpConfig {
    pub name: String,
    #[serde(default)]
    pub public_ip: Option<PublicIpConfig>,
    #[serde(default)]
    pub private_ip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub lb_type: LbType,
    #[serde(default)]
    pub sku: LbSku,
    #[serde(default)]
    pub frontend_ips: Vec<FrontendIpConfig>,
    /// Defaults to `<name>-backendPool`.
    #[serde(default)]
    pub backend_pool_name: Option<String>,
    #[serde(default)]
    pub idle_timeout_in_minutes: Option<i32>,
    /// Subnet for internal frontends.
    #[serde(default)]
    pub subnet_name: Option<String>,
    /// Extra API server ports, each gets its own rule.
    #[serde(default)]
    pub additional_ports: Vec<u16>,
}

impl LoadBalancerConfig {
    pub fn backend_pool_name(&self) -> String {
        self.backend_pool_name
            .clone()
            .unwrap_or_else(|| format!("{}-backendPool", self.name))
    }

    pub fn idle_timeout_in_minutes(&self) -> i32 {
        self.idle_timeout_in_minutes
            .unwrap_or(DEFAULT_IDLE_TIMEOUT_IN_MINUTES)
    }
}

// =============================================================================
// Virtual network configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubnetRole {
    ControlPlane,
    Node,
    Bastion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetConfig {
    pub name: String,
    pub role: SubnetRole,
    #[serde(default)]
    pub cidr_blocks: Vec<String>,
    /// Route table attached to the subnet, if any.
    #[serde(default)]
    pub route_table: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnetConfig {
    /// Set once the vnet exists (copied back after create).
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    /// Defaults to the cluster resource group.
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(default)]
    pub cidr_blocks: Vec<String>,
    #[serde(default)]
    pub tags: Tags,
}

/// An additional vnet linked to the private DNS zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnetLinkConfig {
    pub vnet_name: String,
    pub vnet_resource_group: String,
    /// Defaults to the cluster subscription.
    #[serde(default)]
    pub subscription_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub vnet: VnetConfig,
    #[serde(default)]
    pub subnets: Vec<SubnetConfig>,
    #[serde(default)]
    pub api_server_lb: Option<LoadBalancerConfig>,
    #[serde(default)]
    pub node_outbound_lb: Option<LoadBalancerConfig>,
    #[serde(default)]
    pub control_plane_outbound_lb: Option<LoadBalancerConfig>,
    /// Private DNS zone for private clusters.
    #[serde(default)]
    pub private_dns_zone_name: Option<String>,
    #[serde(default)]
    pub additional_dns_vnet_links: Vec<VnetLinkConfig>,
}

// =============================================================================
// Bastion and private link configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BastionSku {
    #[default]
    Basic,
    Standard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BastionConfig {
    pub name: String,
    #[serde(default = "default_bastion_subnet")]
    pub subnet_name: String,
    pub public_ip: PublicIpConfig,
    #[serde(default)]
    pub sku: BastionSku,
    #[serde(default)]
    pub enable_tunneling: bool,
}

fn default_bastion_subnet() -> String {
    DEFAULT_BASTION_SUBNET_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatIpConfig {
    pub subnet_name: String,
    /// Static address; dynamic allocation when empty.
    #[serde(default)]
    pub private_ip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateLinkConfig {
    pub name: String,
    /// Load balancer whose frontends the link exposes.
    pub lb_name: String,
    pub nat_ip_configurations: Vec<NatIpConfig>,
    #[serde(default)]
    pub allowed_subscriptions: Vec<String>,
    #[serde(default)]
    pub auto_approved_subscriptions: Vec<String>,
    #[serde(default)]
    pub enable_proxy_protocol: Option<bool>,
}

// =============================================================================
// Cluster configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    pub cluster_name: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    #[serde(default)]
    pub additional_tags: Tags,
    #[serde(default)]
    pub failure_domains: Vec<String>,
    pub network: NetworkConfig,
    #[serde(default)]
    pub bastion: Option<BastionConfig>,
    #[serde(default)]
    pub private_links: Vec<PrivateLinkConfig>,
    #[serde(default)]
    pub api_server_port: Option<u16>,
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl ClusterConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ClusterConfig = serde_json::from_str(json)
            .map_err(|e| ReconcileError::Configuration(format!("invalid cluster config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn api_server_port(&self) -> u16 {
        self.api_server_port.unwrap_or(DEFAULT_API_SERVER_PORT)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ReconcileError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Check the invariants every spec derived from this config relies on.
    pub fn validate(&self) -> Result<()> {
        require("clusterName", &self.cluster_name)?;
        require("subscriptionId", &self.subscription_id)?;
        require("resourceGroup", &self.resource_group)?;
        require("location", &self.location)?;
        require("network.vnet.name", &self.network.vnet.name)?;

        for cidr in &self.network.vnet.cidr_blocks {
            parse_cidr(cidr)?;
        }

        let mut subnet_names = HashSet::new();
        for subnet in &self.network.subnets {
            require("subnet name", &subnet.name)?;
            if !subnet_names.insert(subnet.name.as_str()) {
                return Err(ReconcileError::Configuration(format!(
                    "duplicate subnet name {}",
                    subnet.name
                )));
            }
            for cidr in &subnet.cidr_blocks {
                parse_cidr(cidr)?;
            }
        }

        let lbs = [
            &self.network.api_server_lb,
            &self.network.node_outbound_lb,
            &self.network.control_plane_outbound_lb,
        ];
        for lb in lbs.into_iter().flatten() {
            validate_lb(lb)?;
        }

        if self.network.private_dns_zone_name.is_some() {
            let internal = self
                .network
                .api_server_lb
                .as_ref()
                .is_some_and(|lb| lb.lb_type == LbType::Internal);
            if !internal {
                return Err(ReconcileError::Configuration(
                    "privateDnsZoneName requires an internal API server load balancer".into(),
                ));
            }
            let has_address = self
                .network
                .api_server_lb
                .as_ref()
                .and_then(|lb| lb.frontend_ips.first())
                .is_some_and(|fe| fe.private_ip_address.is_some());
            if !has_address {
                return Err(ReconcileError::Configuration(
                    "privateDnsZoneName requires a private IP on the API server frontend".into(),
                ));
            }
        }

        if let Some(bastion) = &self.bastion {
            require("bastion name", &bastion.name)?;
            require("bastion public IP name", &bastion.public_ip.name)?;
        }

        for link in &self.private_links {
            validate_private_link(link)?;
        }

        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ReconcileError::Configuration(format!("{} is required", field)));
    }
    Ok(())
}

fn parse_cidr(cidr: &str) -> Result<IpNet> {
    cidr.parse::<IpNet>()
        .map_err(|_| ReconcileError::Configuration(format!("invalid CIDR block: {}", cidr)))
}

fn validate_lb(lb: &LoadBalancerConfig) -> Result<()> {
    require("load balancer name", &lb.name)?;
    if lb.frontend_ips.is_empty() {
        return Err(ReconcileError::Configuration(format!(
            "load balancer {} needs at least one frontend IP",
            lb.name
        )));
    }
    for frontend in &lb.frontend_ips {
        match (lb.lb_type, &frontend.public_ip) {
            (LbType::Public, None) => {
                return Err(ReconcileError::Configuration(format!(
                    "public load balancer {} frontend {} has no public IP",
                    lb.name, frontend.name
                )));
            }
            (LbType::Internal, Some(_)) => {
                return Err(ReconcileError::Configuration(format!(
                    "internal load balancer {} frontend {} cannot reference a public IP",
                    lb.name, frontend.name
                )));
            }
            _ => {}
        }
    }
    if lb.lb_type == LbType::Internal && lb.subnet_name.is_none() {
        return Err(ReconcileError::Configuration(format!(
            "internal load balancer {} requires subnetName",
            lb.name
        )));
    }
    if lb.idle_timeout_in_minutes() < 4 || lb.idle_timeout_in_minutes() > 30 {
        return Err(ReconcileError::Configuration(format!(
            "load balancer {} idle timeout must be between 4 and 30 minutes",
            lb.name
        )));
    }
    Ok(())
}

fn validate_private_link(link: &PrivateLinkConfig) -> Result<()> {
    require("private link name", &link.name)?;
    require("private link lbName", &link.lb_name)?;
    if link.nat_ip_configurations.is_empty() {
        return Err(ReconcileError::Configuration(format!(
            "private link {} needs at least one NAT IP configuration",
            link.name
        )));
    }
    for subscription in &link.auto_approved_subscriptions {
        if !link.allowed_subscriptions.contains(subscription) {
            return Err(ReconcileError::Configuration(format!(
                "private link {} auto-approves subscription {} which is not allowed",
                link.name, subscription
            )));
        }
    }
    Ok(())
}
