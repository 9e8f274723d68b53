use crate::config::BastionSku;
use crate::error::Result;
use crate::models::{
    BastionHost, BastionIpConfiguration, IpAllocationMethod, Resource, ResourceKind, SubResource,
    downcast,
};
use crate::resource_id;
use crate::spec::ResourceSpec;
use crate::tags::{BuildParams, ResourceLifecycle, Tags, build_tags};

/// Desired state of the cluster bastion host.
#[derive(Debug, Clone, PartialEq)]
pub struct BastionSpec {
    pub name: String,
    pub resource_group: String,
    pub subscription_id: String,
    pub cluster_name: String,
    pub location: String,
    pub subnet_id: String,
    pub public_ip_id: String,
    pub sku: BastionSku,
    pub enable_tunneling: bool,
    pub additional_tags: Tags,
}

impl ResourceSpec for BastionSpec {
    fn resource_name(&self) -> &str {
        &self.name
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::BastionHost
    }

    fn resource_id(&self) -> String {
        resource_id::resource_id(
            &self.subscription_id,
            &self.resource_group,
            resource_id::BASTION_HOSTS,
            &self.name,
        )
    }

    fn parameters(&self, existing: Option<&Resource>) -> Result<Option<Resource>> {
        if downcast::<BastionHost>(existing)?.is_some() {
            return Ok(None);
        }

        Ok(Some(
            BastionHost {
                id: None,
                name: self.name.clone(),
                location: Some(self.location.clone()),
                etag: None,
                tags: build_tags(BuildParams {
                    cluster_name: &self.cluster_name,
                    lifecycle: ResourceLifecycle::Owned,
                    name: Some(&self.name),
                    role: Some("Bastion"),
                    additional: &self.additional_tags,
                }),
                sku: self.sku,
                enable_tunneling: self.enable_tunneling,
                dns_name: Some(self.name.clone()),
                ip_configurations: vec![BastionIpConfiguration {
                    name: format!("{}-bastionIP", self.name),
                    subnet: SubResource::new(self.subnet_id.clone()),
                    public_ip_address: SubResource::new(self.public_ip_id.clone()),
                    private_ip_allocation_method: IpAllocationMethod::Dynamic,
                }],
            }
            .into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bastion_parameters() {
        let spec = BastionSpec {
            name: "my-bastion".to_string(),
            resource_group: "my-rg".to_string(),
            subscription_id: "123".to_string(),
            cluster_name: "my-cluster".to_string(),
            location: "westus".to_string(),
            subnet_id: resource_id::subnet_id("123", "my-rg", "my-vnet", "AzureBastionSubnet"),
            public_ip_id: resource_id::public_ip_id("123", "my-rg", "my-bastion-pip"),
            sku: BastionSku::Standard,
            enable_tunneling: true,
            additional_tags: Tags::new(),
        };

        let Some(Resource::BastionHost(host)) = spec.parameters(None).unwrap() else {
            panic!("expected a bastion host");
        };
        assert_eq!(host.sku, BastionSku::Standard);
        assert!(host.enable_tunneling);
        assert_eq!(host.ip_configurations.len(), 1);
        let ip = &host.ip_configurations[0];
        assert_eq!(ip.name, "my-bastion-bastionIP");
        assert!(ip.subnet.id.ends_with("/subnets/AzureBastionSubnet"));
        assert!(ip.public_ip_address.id.ends_with("/publicIPAddresses/my-bastion-pip"));
        assert_eq!(ip.private_ip_allocation_method, IpAllocationMethod::Dynamic);

        let existing: Resource = host.into();
        assert!(spec.parameters(Some(&existing)).unwrap().is_none());
    }
}
