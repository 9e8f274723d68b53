use crate::error::Result;
use crate::models::{Resource, ResourceKind, RouteTable, downcast};
use crate::resource_id;
use crate::spec::ResourceSpec;
use crate::tags::{BuildParams, ResourceLifecycle, Tags, build_tags};

/// Desired state of one subnet route table.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTableSpec {
    pub name: String,
    pub resource_group: String,
    pub subscription_id: String,
    pub cluster_name: String,
    pub location: String,
    pub additional_tags: Tags,
}

impl ResourceSpec for RouteTableSpec {
    fn resource_name(&self) -> &str {
        &self.name
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::RouteTable
    }

    fn resource_id(&self) -> String {
        resource_id::resource_id(
            &self.subscription_id,
            &self.resource_group,
            resource_id::ROUTE_TABLES,
            &self.name,
        )
    }

    fn parameters(&self, existing: Option<&Resource>) -> Result<Option<Resource>> {
        if downcast::<RouteTable>(existing)?.is_some() {
            return Ok(None);
        }

        Ok(Some(
            RouteTable {
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
                routes: Vec::new(),
            }
            .into(),
        ))
    }
}
