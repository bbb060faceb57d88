use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use tko_backend::Backend;
use tko_core::resource::find;
use tko_core::resource::merge::{prepare_package_for_merge, referent_package};
use tko_core::{Package, Resource, ResourceIdentifier};

use super::Preparation;

/// What a preparer gets to see
pub struct PreparationContext<'a> {
    pub preparation: &'a Preparation,
    pub deployment_id: String,
    /// The deployment's package as of this modification
    pub package: Package,
    pub target: ResourceIdentifier,
}

impl<'a> PreparationContext<'a> {
    pub fn new(
        preparation: &'a Preparation,
        deployment_id: impl Into<String>,
        package: Package,
        target: ResourceIdentifier,
    ) -> Self {
        Self {
            preparation,
            deployment_id: deployment_id.into(),
            package,
            target,
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        self.preparation.backend()
    }

    /// The resource being prepared
    pub fn target_resource(&self) -> Option<&Resource> {
        find(&self.package, &self.target)
    }

    /// Collects the resources named by object references, ready to be merged
    /// into another package
    ///
    /// Returns `None` while any of them still has to be prepared.
    pub async fn merge_package(&self, references: &[Value]) -> Result<Option<Package>> {
        let referents = referent_package(references, &self.package)?;
        for resource in &referents {
            let Some(identifier) = resource.identifier() else {
                continue;
            };
            let (preparable, _) = self
                .preparation
                .should_prepare(&identifier, resource, false)
                .await;
            if preparable {
                info!("aborting merge due to unprepared resource: {}", identifier);
                return Ok(None);
            }
        }
        Ok(Some(prepare_package_for_merge(&referents)))
    }
}
