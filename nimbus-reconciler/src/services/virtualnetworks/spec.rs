use crate::config::SubnetConfig;
use crate::error::Result;
use crate::models::{Resource, ResourceKind, SubResource, Subnet, VirtualNetwork, downcast};
use crate::resource_id;
use crate::spec::ResourceSpec;
use crate::tags::{BuildParams, ResourceLifecycle, Tags, build_tags};

/// Desired state of the cluster virtual network.
#[derive(Debug, Clone, PartialEq)]
pub struct VnetSpec {
    pub name: String,
    pub resource_group: String,
    pub subscription_id: String,
    pub cluster_name: String,
    pub location: String,
    pub cidrs: Vec<String>,
    /// Subnets created together with a new vnet.
    pub subnets: Vec<SubnetConfig>,
    pub additional_tags: Tags,
}

impl ResourceSpec for VnetSpec {
    fn resource_name(&self) -> &str {
        &self.name
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::VirtualNetwork
    }

    fn resource_id(&self) -> String {
        resource_id::vnet_id(&self.subscription_id, &self.resource_group, &self.name)
    }

    fn parameters(&self, existing: Option<&Resource>) -> Result<Option<Resource>> {
        // Existing vnets (owned or brought by the user) are never updated.
        if downcast::<VirtualNetwork>(existing)?.is_some() {
            return Ok(None);
        }

        let subnets = self
            .subnets
            .iter()
            .map(|subnet| Subnet {
                name: subnet.name.clone(),
                id: None,
                address_prefixes: subnet.cidr_blocks.clone(),
                route_table: subnet.route_table.as_ref().map(|rt| {
                    SubResource::new(resource_id::resource_id(
                        &self.subscription_id,
                        &self.resource_group,
                        resource_id::ROUTE_TABLES,
                        rt,
                    ))
                }),
            })
            .collect();

        Ok(Some(
            VirtualNetwork {
                id: None,
                name: self.name.clone(),
                location: Some(self.location.clone()),
                etag: None,
                tags: build_tags(BuildParams {
                    cluster_name: &self.cluster_name,
                    lifecycle: ResourceLifecycle::Owned,
                    name: Some(&self.name),
                    role: Some("common"),
                    additional: &self.additional_tags,
                }),
                address_prefixes: self.cidrs.clone(),
                subnets,
            }
            .into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubnetRole;

    fn spec() -> VnetSpec {
        VnetSpec {
            name: "my-vnet".to_string(),
            resource_group: "my-rg".to_string(),
            subscription_id: "123".to_string(),
            cluster_name: "my-cluster".to_string(),
            location: "westeurope".to_string(),
            cidrs: vec!["10.0.0.0/8".to_string()],
            subnets: vec![SubnetConfig {
                name: "node-subnet".to_string(),
                role: SubnetRole::Node,
                cidr_blocks: vec!["10.1.0.0/16".to_string()],
                route_table: Some("node-rt".to_string()),
            }],
            additional_tags: Tags::new(),
        }
    }

    #[test]
    fn test_new_vnet() {
        let Resource::VirtualNetwork(vnet) = spec().parameters(None).unwrap().unwrap() else {
            panic!("expected a virtual network");
        };
        assert_eq!(vnet.address_prefixes, vec!["10.0.0.0/8"]);
        assert_eq!(vnet.subnets.len(), 1);
        assert!(vnet.subnets[0]
            .route_table
            .as_ref()
            .unwrap()
            .id
            .ends_with("/routeTables/node-rt"));
        assert!(vnet.tags.has_owned("my-cluster"));
    }

    #[test]
    fn test_existing_vnet_is_left_alone() {
        let existing: Resource = VirtualNetwork {
            name: "my-vnet".to_string(),
            ..Default::default()
        }
        .into();
        assert!(spec().parameters(Some(&existing)).unwrap().is_none());
    }
}
