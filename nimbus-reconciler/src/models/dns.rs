//! Private DNS entities.

use serde::{Deserialize, Serialize};

use super::network::SubResource;
use crate::tags::Tags;

/// Private DNS zones are always global.
pub const GLOBAL_LOCATION: &str = "global";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateZone {
    pub id: Option<String>,
    pub name: String,
    pub location: Option<String>,
    pub etag: Option<String>,
    pub tags: Tags,
    pub number_of_record_sets: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualNetworkLink {
    pub id: Option<String>,
    pub name: String,
    pub location: Option<String>,
    pub etag: Option<String>,
    pub tags: Tags,
    pub virtual_network: SubResource,
    pub registration_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordType {
    #[default]
    A,
    AAAA,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ARecord {
    pub ipv4_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AaaaRecord {
    pub ipv6_address: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordSet {
    pub id: Option<String>,
    pub name: String,
    pub etag: Option<String>,
    /// Record sets carry metadata rather than tags; exposed as tags for
    /// uniform ownership checks.
    pub tags: Tags,
    pub record_type: RecordType,
    pub ttl: i64,
    pub a_records: Vec<ARecord>,
    pub aaaa_records: Vec<AaaaRecord>,
}
