use std::collections::BTreeMap;

use tko_core::resource::find;
use tko_core::{Package, Resource, ResourceIdentifier};

/// What an instantiator gets to see
#[derive(Debug, Clone)]
pub struct InstantiationContext {
    pub site_id: String,
    pub site_package: Package,
    pub target: ResourceIdentifier,
    /// Prepared deployments placed at the site, by deployment ID
    pub deployments: BTreeMap<String, Package>,
}

impl InstantiationContext {
    /// The resource this instantiation is for
    pub fn target_resource(&self) -> Option<&Resource> {
        find(&self.site_package, &self.target)
    }
}
