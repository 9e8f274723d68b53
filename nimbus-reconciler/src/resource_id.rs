//! Vendor resource identifiers.
//!
//! IDs have the shape
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{childType}/{childName}]*`.

use crate::error::{ReconcileError, Result};

pub const LOAD_BALANCERS: &str = "Microsoft.Network/loadBalancers";
pub const PUBLIC_IP_ADDRESSES: &str = "Microsoft.Network/publicIPAddresses";
pub const ROUTE_TABLES: &str = "Microsoft.Network/routeTables";
pub const VIRTUAL_NETWORKS: &str = "Microsoft.Network/virtualNetworks";
pub const PRIVATE_DNS_ZONES: &str = "Microsoft.Network/privateDnsZones";
pub const BASTION_HOSTS: &str = "Microsoft.Network/bastionHosts";
pub const PRIVATE_LINK_SERVICES: &str = "Microsoft.Network/privateLinkServices";
pub const VIRTUAL_MACHINE_SCALE_SETS: &str = "Microsoft.Compute/virtualMachineScaleSets";
pub const VIRTUAL_MACHINES: &str = "Microsoft.Compute/virtualMachines";

/// Scheme prefix of node provider IDs.
pub const PROVIDER_ID_PREFIX: &str = "azure://";

/// ID of a top-level resource.
pub fn resource_id(subscription_id: &str, resource_group: &str, resource_type: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
        subscription_id, resource_group, resource_type, name
    )
}

/// ID of a child resource (e.g. a subnet inside a vnet).
pub fn child_resource_id(
    subscription_id: &str,
    resource_group: &str,
    resource_type: &str,
    parent: &str,
    child_type: &str,
    child: &str,
) -> String {
    format!(
        "{}/{}/{}",
        resource_id(subscription_id, resource_group, resource_type, parent),
        child_type,
        child
    )
}

pub fn public_ip_id(subscription_id: &str, resource_group: &str, name: &str) -> String {
    resource_id(subscription_id, resource_group, PUBLIC_IP_ADDRESSES, name)
}

pub fn vnet_id(subscription_id: &str, resource_group: &str, vnet: &str) -> String {
    resource_id(subscription_id, resource_group, VIRTUAL_NETWORKS, vnet)
}

pub fn subnet_id(subscription_id: &str, resource_group: &str, vnet: &str, subnet: &str) -> String {
    child_resource_id(subscription_id, resource_group, VIRTUAL_NETWORKS, vnet, "subnets", subnet)
}

pub fn frontend_ip_config_id(subscription_id: &str, resource_group: &str, lb: &str, frontend: &str) -> String {
    child_resource_id(
        subscription_id,
        resource_group,
        LOAD_BALANCERS,
        lb,
        "frontendIPConfigurations",
        frontend,
    )
}

pub fn backend_pool_id(subscription_id: &str, resource_group: &str, lb: &str, pool: &str) -> String {
    child_resource_id(subscription_id, resource_group, LOAD_BALANCERS, lb, "backendAddressPools", pool)
}

pub fn probe_id(subscription_id: &str, resource_group: &str, lb: &str, probe: &str) -> String {
    child_resource_id(subscription_id, resource_group, LOAD_BALANCERS, lb, "probes", probe)
}

/// A parsed resource ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    /// Full type, including child segments (e.g. `Microsoft.Network/virtualNetworks/subnets`).
    pub resource_type: String,
    /// Name of the innermost resource.
    pub name: String,
    /// Name of the immediate parent for child resources.
    pub parent: Option<String>,
}

/// Parse a fully-qualified resource ID.
pub fn parse_resource_id(id: &str) -> Result<ResourceId> {
    let invalid = || ReconcileError::Configuration(format!("invalid resource ID: {}", id));
    let segments: Vec<&str> = id.trim_start_matches('/').split('/').collect();

    // subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name} is 8 segments,
    // every child adds two more.
    if segments.len() < 8 || segments.len() % 2 != 0 {
        return Err(invalid());
    }
    if !segments[0].eq_ignore_ascii_case("subscriptions")
        || !segments[2].eq_ignore_ascii_case("resourceGroups")
        || !segments[4].eq_ignore_ascii_case("providers")
    {
        return Err(invalid());
    }
    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid());
    }

    let mut resource_type = format!("{}/{}", segments[5], segments[6]);
    let mut names = vec![segments[7]];
    let mut rest = &segments[8..];
    while let [child_type, child_name, tail @ ..] = rest {
        resource_type.push('/');
        resource_type.push_str(child_type);
        names.push(child_name);
        rest = tail;
    }

    let name = names.pop().ok_or_else(invalid)?;
    Ok(ResourceId {
        subscription_id: segments[1].to_string(),
        resource_group: segments[3].to_string(),
        resource_type,
        name: name.to_string(),
        parent: names.pop().map(str::to_string),
    })
}

/// Parse a provider ID of the form `azure:///<resource-id>`.
pub fn parse_provider_id(provider_id: &str) -> Result<ResourceId> {
    let id = provider_id.strip_prefix(PROVIDER_ID_PREFIX).ok_or_else(|| {
        ReconcileError::Configuration(format!("invalid provider ID: {}", provider_id))
    })?;
    parse_resource_id(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        assert_eq!(
            public_ip_id("sub", "rg", "pip"),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/pip"
        );
        assert_eq!(
            frontend_ip_config_id("sub", "rg", "lb", "fe"),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/lb/frontendIPConfigurations/fe"
        );
        assert_eq!(
            subnet_id("sub", "rg", "vnet", "snet"),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/snet"
        );
    }

    #[test]
    fn test_parse_top_level() {
        let id = parse_resource_id(&vnet_id("sub", "rg", "vnet")).unwrap();
        assert_eq!(id.subscription_id, "sub");
        assert_eq!(id.resource_group, "rg");
        assert_eq!(id.resource_type, VIRTUAL_NETWORKS);
        assert_eq!(id.name, "vnet");
        assert_eq!(id.parent, None);
    }

    #[test]
    fn test_parse_child() {
        let id = parse_resource_id(&subnet_id("sub", "rg", "vnet", "snet")).unwrap();
        assert_eq!(id.resource_type, "Microsoft.Network/virtualNetworks/subnets");
        assert_eq!(id.name, "snet");
        assert_eq!(id.parent.as_deref(), Some("vnet"));
    }

    #[test]
    fn test_parse_provider_id() {
        let id = parse_provider_id(
            "azure:///subscriptions/sub/resourceGroups/my-rg/providers/Microsoft.Compute/virtualMachines/my-vm",
        )
        .unwrap();
        assert_eq!(id.resource_type, VIRTUAL_MACHINES);
        assert_eq!(id.resource_group, "my-rg");
        assert_eq!(id.name, "my-vm");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_resource_id("").is_err());
        assert!(parse_resource_id("/subscriptions/sub/resourceGroups/rg").is_err());
        assert!(parse_resource_id("/subs/sub/resourceGroups/rg/providers/ns/type/name").is_err());
        assert!(parse_resource_id("/subscriptions/sub/resourceGroups/rg/providers/ns/type/name/child").is_err());
        assert!(parse_provider_id("aws:///subscriptions/sub/resourceGroups/rg/providers/ns/type/name").is_err());
    }
}
