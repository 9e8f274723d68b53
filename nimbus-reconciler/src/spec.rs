//! The contract every resource kind implements.

use std::fmt::Debug;

use crate::error::Result;
use crate::models::{Resource, ResourceKind};

/// A declarative description of one desired vendor resource.
pub trait ResourceSpec: Send + Sync + Debug {
    fn resource_name(&self) -> &str;

    fn resource_group_name(&self) -> &str;

    /// Name of the immediate parent for sub-resources, empty when top-level.
    fn owner_resource_name(&self) -> &str {
        ""
    }

    fn resource_kind(&self) -> ResourceKind;

    /// Fully-qualified vendor ID, used for tag-scope lookups.
    fn resource_id(&self) -> String;

    /// Compute the body to PUT given the live state.
    ///
    /// `Ok(None)` means the resource already converged and no call is made.
    /// An update body must carry the existing entity tag.
    fn parameters(&self, existing: Option<&Resource>) -> Result<Option<Resource>>;
}
