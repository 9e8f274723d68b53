//! Network resource entities: load balancers, public IPs, route tables,
//! virtual networks, bastion hosts and private link services.

use serde::{Deserialize, Serialize};

use crate::merge::Named;
use crate::tags::Tags;

/// Reference to another resource by ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SubResource {
    pub id: String,
}

impl SubResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IpAllocationMethod {
    #[default]
    Dynamic,
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IpVersion {
    #[default]
    IPv4,
    IPv6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sku {
    Basic,
    #[default]
    Standard,
}

// =============================================================================
// Load balancer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportProtocol {
    #[default]
    Tcp,
    Udp,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadDistribution {
    #[default]
    Default,
    SourceIP,
    SourceIPProtocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProbeProtocol {
    #[default]
    Tcp,
    Http,
    Https,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrontendIpConfiguration {
    pub name: String,
    pub id: Option<String>,
    pub public_ip_address: Option<SubResource>,
    pub subnet: Option<SubResource>,
    pub private_ip_address: Option<String>,
    pub private_ip_allocation_method: Option<IpAllocationMethod>,
    pub zones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendAddressPool {
    pub name: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadBalancingRule {
    pub name: String,
    pub protocol: TransportProtocol,
    pub frontend_port: u16,
    pub backend_port: u16,
    pub idle_timeout_in_minutes: i32,
    pub enable_floating_ip: bool,
    pub disable_outbound_snat: bool,
    pub load_distribution: LoadDistribution,
    pub frontend_ip_configuration: Option<SubResource>,
    pub backend_address_pool: Option<SubResource>,
    pub probe: Option<SubResource>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Probe {
    pub name: String,
    pub protocol: ProbeProtocol,
    pub port: u16,
    pub request_path: Option<String>,
    pub interval_in_seconds: i32,
    pub number_of_probes: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutboundRule {
    pub name: String,
    pub protocol: TransportProtocol,
    pub idle_timeout_in_minutes: i32,
    pub enable_tcp_reset: bool,
    pub frontend_ip_configurations: Vec<SubResource>,
    pub backend_address_pool: Option<SubResource>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadBalancer {
    pub id: Option<String>,
    pub name: String,
    pub location: Option<String>,
    pub etag: Option<String>,
    pub tags: Tags,
    pub sku: Sku,
    pub frontend_ip_configurations: Vec<FrontendIpConfiguration>,
    pub backend_address_pools: Vec<BackendAddressPool>,
    pub load_balancing_rules: Vec<LoadBalancingRule>,
    pub probes: Vec<Probe>,
    pub outbound_rules: Vec<OutboundRule>,
    pub provisioning_state: Option<String>,
}

// =============================================================================
// Public IP address
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpTag {
    pub ip_tag_type: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsSettings {
    pub domain_name_label: String,
    pub fqdn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublicIpAddress {
    pub id: Option<String>,
    pub name: String,
    pub location: Option<String>,
    pub etag: Option<String>,
    pub tags: Tags,
    pub sku: Sku,
    pub allocation_method: IpAllocationMethod,
    pub ip_version: IpVersion,
    pub dns_settings: Option<DnsSettings>,
    pub ip_tags: Vec<IpTag>,
    pub zones: Vec<String>,
    pub ip_address: Option<String>,
}

// =============================================================================
// Route table
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Route {
    pub name: String,
    pub address_prefix: String,
    pub next_hop_type: String,
    pub next_hop_ip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteTable {
    pub id: Option<String>,
    pub name: String,
    pub location: Option<String>,
    pub etag: Option<String>,
    pub tags: Tags,
    pub routes: Vec<Route>,
}

// =============================================================================
// Virtual network
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subnet {
    pub name: String,
    pub id: Option<String>,
    pub address_prefixes: Vec<String>,
    pub route_table: Option<SubResource>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualNetwork {
    pub id: Option<String>,
    pub name: String,
    pub location: Option<String>,
    pub etag: Option<String>,
    pub tags: Tags,
    pub address_prefixes: Vec<String>,
    pub subnets: Vec<Subnet>,
}

// =============================================================================
// Bastion host
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BastionIpConfiguration {
    pub name: String,
    pub subnet: SubResource,
    pub public_ip_address: SubResource,
    pub private_ip_allocation_method: IpAllocationMethod,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BastionHost {
    pub id: Option<String>,
    pub name: String,
    pub location: Option<String>,
    pub etag: Option<String>,
    pub tags: Tags,
    pub sku: crate::config::BastionSku,
    pub enable_tunneling: bool,
    pub dns_name: Option<String>,
    pub ip_configurations: Vec<BastionIpConfiguration>,
}

// =============================================================================
// Private link service
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateLinkIpConfiguration {
    pub name: String,
    pub subnet: SubResource,
    pub private_ip_address: Option<String>,
    pub private_ip_allocation_method: IpAllocationMethod,
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateLinkService {
    pub id: Option<String>,
    pub name: String,
    pub location: Option<String>,
    pub etag: Option<String>,
    pub tags: Tags,
    pub load_balancer_frontend_ip_configurations: Vec<SubResource>,
    pub ip_configurations: Vec<PrivateLinkIpConfiguration>,
    /// Subscriptions allowed to request a connection.
    pub visibility: Vec<String>,
    /// Subscriptions whose connections are approved automatically.
    pub auto_approval: Vec<String>,
    pub enable_proxy_protocol: Option<bool>,
}

macro_rules! impl_named {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Named for $ty {
                fn name(&self) -> &str {
                    &self.name
                }
            }
        )*
    };
}

impl_named!(
    FrontendIpConfiguration,
    BackendAddressPool,
    LoadBalancingRule,
    Probe,
    OutboundRule,
    Route,
    Subnet,
    BastionIpConfiguration,
    PrivateLinkIpConfiguration,
);
