//! Resource tags and the cluster ownership tag.
//!
//! A resource is managed by a cluster only when it carries
//! `cluster-api-provider-azure_cluster_<cluster-name>: owned`. Anything else
//! is treated as bring-your-own and is never mutated or deleted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Prefix of the per-cluster ownership tag key.
pub const CLUSTER_TAG_PREFIX: &str = "cluster-api-provider-azure_cluster_";
/// Key of the role tag.
pub const ROLE_TAG_KEY: &str = "cluster-api-provider-azure_role";
/// Key of the human-readable name tag.
pub const NAME_TAG_KEY: &str = "Name";

/// Lifecycle value of the ownership tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLifecycle {
    /// Created and destroyed by this cluster.
    Owned,
    /// Used but not owned by this cluster.
    Shared,
}

impl ResourceLifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceLifecycle::Owned => "owned",
            ResourceLifecycle::Shared => "shared",
        }
    }
}

/// Ownership tag key for a cluster.
pub fn cluster_tag_key(cluster_name: &str) -> String {
    format!("{}{}", CLUSTER_TAG_PREFIX, cluster_name)
}

/// Free-form resource tags.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// True when the tags mark the resource as owned by `cluster_name`.
    pub fn has_owned(&self, cluster_name: &str) -> bool {
        self.get(&cluster_tag_key(cluster_name)) == Some(ResourceLifecycle::Owned.as_str())
    }

    /// Overlay `other` on top of these tags.
    pub fn merge(&self, other: &Tags) -> Tags {
        let mut merged = self.clone();
        for (k, v) in other.iter() {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Tags(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Inputs to [`build_tags`].
#[derive(Debug, Clone)]
pub struct BuildParams<'a> {
    pub cluster_name: &'a str,
    pub lifecycle: ResourceLifecycle,
    pub name: Option<&'a str>,
    pub role: Option<&'a str>,
    pub additional: &'a Tags,
}

/// Build the tag set for a resource this cluster creates.
///
/// User tags go in first; the ownership, role and name tags are written last
/// and cannot be overridden by them.
pub fn build_tags(params: BuildParams<'_>) -> Tags {
    let mut tags = params.additional.clone();
    tags.insert(cluster_tag_key(params.cluster_name), params.lifecycle.as_str());
    if let Some(role) = params.role {
        tags.insert(ROLE_TAG_KEY, role);
    }
    if let Some(name) = params.name {
        tags.insert(NAME_TAG_KEY, name);
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_tag_key() {
        assert_eq!(
            cluster_tag_key("my-cluster"),
            "cluster-api-provider-azure_cluster_my-cluster"
        );
    }

    #[test]
    fn test_has_owned() {
        let owned: Tags = [(cluster_tag_key("c1"), "owned")].into_iter().collect();
        assert!(owned.has_owned("c1"));
        assert!(!owned.has_owned("c2"));

        let shared: Tags = [(cluster_tag_key("c1"), "shared")].into_iter().collect();
        assert!(!shared.has_owned("c1"));
        assert!(!Tags::new().has_owned("c1"));
    }

    #[test]
    fn test_build_tags_ownership_wins_over_additional() {
        let additional: Tags = [
            ("team", "infra"),
            ("cluster-api-provider-azure_cluster_c1", "shared"),
        ]
        .into_iter()
        .collect();

        let tags = build_tags(BuildParams {
            cluster_name: "c1",
            lifecycle: ResourceLifecycle::Owned,
            name: Some("my-lb"),
            role: Some("apiserver"),
            additional: &additional,
        });

        assert!(tags.has_owned("c1"));
        assert_eq!(tags.get("team"), Some("infra"));
        assert_eq!(tags.get(ROLE_TAG_KEY), Some("apiserver"));
        assert_eq!(tags.get(NAME_TAG_KEY), Some("my-lb"));
        assert_eq!(tags.len(), 4);
    }

    #[test]
    fn test_merge_overlays() {
        let base: Tags = [("a", "1"), ("b", "2")].into_iter().collect();
        let overlay: Tags = [("b", "3"), ("c", "4")].into_iter().collect();
        let merged = base.merge(&overlay);
        assert_eq!(merged.get("a"), Some("1"));
        assert_eq!(merged.get("b"), Some("3"));
        assert_eq!(merged.get("c"), Some("4"));
    }

    #[test]
    fn test_tags_serialize_as_map() {
        let tags: Tags = [("k", "v")].into_iter().collect();
        assert_eq!(serde_json::to_string(&tags).unwrap(), r#"{"k":"v"}"#);
    }
}
