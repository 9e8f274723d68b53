use std::net::IpAddr;

use crate::error::{ReconcileError, Result};
use crate::models::{
    AaaaRecord, ARecord, PrivateZone, RecordSet, RecordType, Resource, ResourceKind, SubResource,
    VirtualNetworkLink, downcast, dns::GLOBAL_LOCATION,
};
use crate::resource_id;
use crate::spec::ResourceSpec;
use crate::tags::{BuildParams, ResourceLifecycle, Tags, build_tags};

/// TTL of the records written into the zone, in seconds.
pub const RECORD_TTL_SECS: i64 = 300;

/// Child type segment of vnet links in a zone ID.
const VIRTUAL_NETWORK_LINKS: &str = "virtualNetworkLinks";

/// Everything the private DNS service reconciles for one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct PrivateDnsSpec {
    pub zone: PrivateDnsZoneSpec,
    pub links: Vec<VnetLinkSpec>,
    pub records: Vec<RecordSpec>,
}

// =============================================================================
// Zone
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PrivateDnsZoneSpec {
    pub name: String,
    pub resource_group: String,
    pub subscription_id: String,
    pub cluster_name: String,
    pub additional_tags: Tags,
}

impl ResourceSpec for PrivateDnsZoneSpec {
    fn resource_name(&self) -> &str {
        &self.name
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::PrivateZone
    }

    fn resource_id(&self) -> String {
        resource_id::resource_id(
            &self.subscription_id,
            &self.resource_group,
            resource_id::PRIVATE_DNS_ZONES,
            &self.name,
        )
    }

    fn parameters(&self, existing: Option<&Resource>) -> Result<Option<Resource>> {
        if downcast::<PrivateZone>(existing)?.is_some() {
            return Ok(None);
        }

        Ok(Some(
            PrivateZone {
                id: None,
                name: self.name.clone(),
                location: Some(GLOBAL_LOCATION.to_string()),
                etag: None,
                tags: build_tags(BuildParams {
                    cluster_name: &self.cluster_name,
                    lifecycle: ResourceLifecycle::Owned,
                    name: Some(&self.name),
                    role: None,
                    additional: &self.additional_tags,
                }),
                number_of_record_sets: None,
            }
            .into(),
        ))
    }
}

// =============================================================================
// Virtual network link
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct VnetLinkSpec {
    /// Link name, `<vnet>-link` by convention.
    pub name: String,
    pub zone_name: String,
    pub resource_group: String,
    pub subscription_id: String,
    /// Full ID of the linked vnet.
    pub vnet_id: String,
    pub cluster_name: String,
    pub additional_tags: Tags,
}

impl ResourceSpec for VnetLinkSpec {
    fn resource_name(&self) -> &str {
        &self.name
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    fn owner_resource_name(&self) -> &str {
        &self.zone_name
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::VirtualNetworkLink
    }

    fn resource_id(&self) -> String {
        resource_id::child_resource_id(
            &self.subscription_id,
            &self.resource_group,
            resource_id::PRIVATE_DNS_ZONES,
            &self.zone_name,
            VIRTUAL_NETWORK_LINKS,
            &self.name,
        )
    }

    fn parameters(&self, existing: Option<&Resource>) -> Result<Option<Resource>> {
        if downcast::<VirtualNetworkLink>(existing)?.is_some() {
            return Ok(None);
        }

        Ok(Some(
            VirtualNetworkLink {
                id: None,
                name: self.name.clone(),
                location: Some(GLOBAL_LOCATION.to_string()),
                etag: None,
                tags: build_tags(BuildParams {
                    cluster_name: &self.cluster_name,
                    lifecycle: ResourceLifecycle::Owned,
                    name: Some(&self.name),
                    role: None,
                    additional: &self.additional_tags,
                }),
                virtual_network: SubResource::new(self.vnet_id.clone()),
                registration_enabled: false,
            }
            .into(),
        ))
    }
}

// =============================================================================
// Record set
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSpec {
    /// Relative record name inside the zone.
    pub hostname: String,
    pub ip: String,
    pub zone_name: String,
    pub resource_group: String,
    pub subscription_id: String,
}

impl RecordSpec {
    /// A or AAAA, by the address family of `ip`.
    pub fn record_type(&self) -> Result<RecordType> {
        match self.ip.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => Ok(RecordType::A),
            Ok(IpAddr::V6(_)) => Ok(RecordType::AAAA),
            Err(_) => Err(ReconcileError::Configuration(format!(
                "invalid IP address {} for record {}",
                self.ip, self.hostname
            ))),
        }
    }

    fn type_segment(&self) -> &'static str {
        match self.record_type() {
            Ok(RecordType::AAAA) => "AAAA",
            _ => "A",
        }
    }
}

impl ResourceSpec for RecordSpec {
    fn resource_name(&self) -> &str {
        &self.hostname
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    fn owner_resource_name(&self) -> &str {
        &self.zone_name
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::RecordSet
    }

    fn resource_id(&self) -> String {
        resource_id::child_resource_id(
            &self.subscription_id,
            &self.resource_group,
            resource_id::PRIVATE_DNS_ZONES,
            &self.zone_name,
            self.type_segment(),
            &self.hostname,
        )
    }

    fn parameters(&self, existing: Option<&Resource>) -> Result<Option<Resource>> {
        let record_type = self.record_type()?;
        let existing = downcast::<RecordSet>(existing)?;

        let mut set = match existing {
            Some(set) => {
                let present = match record_type {
                    RecordType::A => set.a_records.iter().any(|r| r.ipv4_address == self.ip),
                    RecordType::AAAA => set.aaaa_records.iter().any(|r| r.ipv6_address == self.ip),
                };
                if present {
                    return Ok(None);
                }
                set.clone()
            }
            None => RecordSet {
                name: self.hostname.clone(),
                record_type,
                ttl: RECORD_TTL_SECS,
                ..Default::default()
            },
        };

        match record_type {
            RecordType::A => set.a_records.push(ARecord {
                ipv4_address: self.ip.clone(),
            }),
            RecordType::AAAA => set.aaaa_records.push(AaaaRecord {
                ipv6_address: self.ip.clone(),
            }),
        }
        Ok(Some(set.into()))
    }
}
