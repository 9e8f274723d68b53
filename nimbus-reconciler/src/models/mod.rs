//! Vendor resource entities.
//!
//! [`Resource`] is a tagged variant over the closed set of kinds the engine
//! manages. Specs receive existing state as `Option<&Resource>` and narrow it
//! with [`downcast`], which fails with `TypeMismatch` on the wrong kind.

pub mod compute;
pub mod dns;
pub mod network;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result};
use crate::tags::Tags;

pub use compute::{OrchestrationMode, ProvisioningState, ScaleSetVm, VirtualMachine, VmssVm};
pub use dns::{AaaaRecord, ARecord, PrivateZone, RecordSet, RecordType, VirtualNetworkLink};
pub use network::{
    BackendAddressPool, BastionHost, BastionIpConfiguration, DnsSettings, FrontendIpConfiguration,
    IpAllocationMethod, IpTag, IpVersion, LoadBalancer, LoadBalancingRule, LoadDistribution,
    OutboundRule, PrivateLinkIpConfiguration, PrivateLinkService, Probe, ProbeProtocol,
    PublicIpAddress, Route, RouteTable, Sku, SubResource, Subnet, TransportProtocol,
    VirtualNetwork,
};

/// Kind discriminator of a [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    LoadBalancer,
    PublicIpAddress,
    RouteTable,
    VirtualNetwork,
    PrivateZone,
    VirtualNetworkLink,
    RecordSet,
    BastionHost,
    PrivateLinkService,
    ScaleSetVm,
    VirtualMachine,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::LoadBalancer => "LoadBalancer",
            ResourceKind::PublicIpAddress => "PublicIPAddress",
            ResourceKind::RouteTable => "RouteTable",
            ResourceKind::VirtualNetwork => "VirtualNetwork",
            ResourceKind::PrivateZone => "PrivateZone",
            ResourceKind::VirtualNetworkLink => "VirtualNetworkLink",
            ResourceKind::RecordSet => "RecordSet",
            ResourceKind::BastionHost => "BastionHost",
            ResourceKind::PrivateLinkService => "PrivateLinkService",
            ResourceKind::ScaleSetVm => "VirtualMachineScaleSetVM",
            ResourceKind::VirtualMachine => "VirtualMachine",
        };
        write!(f, "{}", s)
    }
}

/// A vendor resource of any managed kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Resource {
    LoadBalancer(LoadBalancer),
    PublicIpAddress(PublicIpAddress),
    RouteTable(RouteTable),
    VirtualNetwork(VirtualNetwork),
    PrivateZone(PrivateZone),
    VirtualNetworkLink(VirtualNetworkLink),
    RecordSet(RecordSet),
    BastionHost(BastionHost),
    PrivateLinkService(PrivateLinkService),
    ScaleSetVm(ScaleSetVm),
    VirtualMachine(VirtualMachine),
}

macro_rules! dispatch {
    ($value:expr, $r:ident => $body:expr) => {
        match $value {
            Resource::LoadBalancer($r) => $body,
            Resource::PublicIpAddress($r) => $body,
            Resource::RouteTable($r) => $body,
            Resource::VirtualNetwork($r) => $body,
            Resource::PrivateZone($r) => $body,
            Resource::VirtualNetworkLink($r) => $body,
            Resource::RecordSet($r) => $body,
            Resource::BastionHost($r) => $body,
            Resource::PrivateLinkService($r) => $body,
            Resource::ScaleSetVm($r) => $body,
            Resource::VirtualMachine($r) => $body,
        }
    };
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::LoadBalancer(_) => ResourceKind::LoadBalancer,
            Resource::PublicIpAddress(_) => ResourceKind::PublicIpAddress,
            Resource::RouteTable(_) => ResourceKind::RouteTable,
            Resource::VirtualNetwork(_) => ResourceKind::VirtualNetwork,
            Resource::PrivateZone(_) => ResourceKind::PrivateZone,
            Resource::VirtualNetworkLink(_) => ResourceKind::VirtualNetworkLink,
            Resource::RecordSet(_) => ResourceKind::RecordSet,
            Resource::BastionHost(_) => ResourceKind::BastionHost,
            Resource::PrivateLinkService(_) => ResourceKind::PrivateLinkService,
            Resource::ScaleSetVm(_) => ResourceKind::ScaleSetVm,
            Resource::VirtualMachine(_) => ResourceKind::VirtualMachine,
        }
    }

    pub fn name(&self) -> &str {
        dispatch!(self, r => &r.name)
    }

    pub fn id(&self) -> Option<&str> {
        dispatch!(self, r => r.id.as_deref())
    }

    pub fn tags(&self) -> &Tags {
        dispatch!(self, r => &r.tags)
    }

    /// Entity tag used as the `If-Match` precondition on update.
    pub fn etag(&self) -> Option<&str> {
        dispatch!(self, r => r.etag.as_deref())
    }

    pub fn set_etag(&mut self, etag: Option<String>) {
        dispatch!(self, r => r.etag = etag)
    }

    /// Record the vendor-assigned ID.
    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        dispatch!(self, r => r.id = Some(id))
    }
}

/// A concrete entity type wrapped by [`Resource`].
pub trait ResourceModel: Sized {
    const KIND: ResourceKind;

    fn from_resource(resource: &Resource) -> Option<&Self>;
}

macro_rules! resource_model {
    ($($variant:ident),* $(,)?) => {
        $(
            impl ResourceModel for $variant {
                const KIND: ResourceKind = ResourceKind::$variant;

                fn from_resource(resource: &Resource) -> Option<&Self> {
                    match resource {
                        Resource::$variant(r) => Some(r),
                        _ => None,
                    }
                }
            }

            impl From<$variant> for Resource {
                fn from(r: $variant) -> Self {
                    Resource::$variant(r)
                }
            }
        )*
    };
}

resource_model!(
    LoadBalancer,
    PublicIpAddress,
    RouteTable,
    VirtualNetwork,
    PrivateZone,
    VirtualNetworkLink,
    RecordSet,
    BastionHost,
    PrivateLinkService,
    ScaleSetVm,
    VirtualMachine,
);

/// Narrow optional existing state to `T`.
pub fn downcast<T: ResourceModel>(existing: Option<&Resource>) -> Result<Option<&T>> {
    match existing {
        None => Ok(None),
        Some(resource) => T::from_resource(resource)
            .map(Some)
            .ok_or_else(|| ReconcileError::TypeMismatch {
                expected: T::KIND.to_string(),
                actual: resource.kind().to_string(),
            }),
    }
}
