use crate::error::{ReconcileError, Result};
use crate::models::{
    DnsSettings, IpAllocationMethod, IpTag, IpVersion, PublicIpAddress, Resource, ResourceKind, Sku,
    downcast,
};
use crate::resource_id;
use crate::spec::ResourceSpec;
use crate::tags::{BuildParams, ResourceLifecycle, Tags, build_tags};

/// Desired state of one public IP address.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicIpSpec {
    pub name: String,
    pub resource_group: String,
    pub subscription_id: String,
    pub cluster_name: String,
    pub location: String,
    /// Fully-qualified DNS name; the first label becomes the domain label.
    pub dns_name: Option<String>,
    pub is_ipv6: bool,
    pub ip_tags: Vec<IpTag>,
    pub failure_domains: Vec<String>,
    pub additional_tags: Tags,
}

impl ResourceSpec for PublicIpSpec {
    fn resource_name(&self) -> &str {
        &self.name
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::PublicIpAddress
    }

    fn resource_id(&self) -> String {
        resource_id::public_ip_id(&self.subscription_id, &self.resource_group, &self.name)
    }

    fn parameters(&self, existing: Option<&Resource>) -> Result<Option<Resource>> {
        // An existing address is authoritative; never update it.
        if downcast::<PublicIpAddress>(existing)?.is_some() {
            return Ok(None);
        }

        if self.name.is_empty() {
            return Err(ReconcileError::Configuration("public IP name is required".into()));
        }

        let dns_settings = match &self.dns_name {
            Some(fqdn) => {
                let label = fqdn.split('.').next().unwrap_or_default();
                if label.is_empty() {
                    return Err(ReconcileError::Configuration(format!(
                        "invalid DNS name {} for public IP {}",
                        fqdn, self.name
                    )));
                }
                Some(DnsSettings {
                    domain_name_label: label.to_string(),
                    fqdn: Some(fqdn.clone()),
                })
            }
            None => None,
        };

        Ok(Some(
            PublicIpAddress {
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
                sku: Sku::Standard,
                allocation_method: IpAllocationMethod::Static,
                ip_version: if self.is_ipv6 { IpVersion::IPv6 } else { IpVersion::IPv4 },
                dns_settings,
                ip_tags: self.ip_tags.clone(),
                zones: self.failure_domains.clone(),
                ip_address: None,
            }
            .into(),
        ))
    }
}
