//! Deployment domain types
//!
//! A deployment package always embeds one marker document
//! (`deployment.nephio.org/v1alpha1` `Deployment`, named `deployment`) that
//! mirrors the template, site, prepared and approved fields. The marker is
//! the source of truth; the struct fields are refreshed from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::template::Template;
use crate::resource::merge::{merge_package, prepare_package_for_merge};
use crate::resource::metadata::{Metadata, update_metadata};
use crate::resource::{Gvk, Package, Resource, ResourceIdentifier, find};

pub const DEPLOYMENT_GROUP: &str = "deployment.nephio.org";
pub const DEPLOYMENT_VERSION: &str = "v1alpha1";
pub const DEPLOYMENT_KIND: &str = "Deployment";
pub const DEPLOYMENT_RESOURCE_NAME: &str = "deployment";

pub fn deployment_gvk() -> Gvk {
    Gvk::new(DEPLOYMENT_GROUP, DEPLOYMENT_VERSION, DEPLOYMENT_KIND)
}

/// Identity of the marker document
pub fn deployment_resource_identifier() -> ResourceIdentifier {
    deployment_gvk().identifier(DEPLOYMENT_RESOURCE_NAME)
}

/// Builds a marker document
pub fn new_deployment_resource(
    template_id: Option<&str>,
    site_id: Option<&str>,
    prepared: bool,
    approved: bool,
) -> Resource {
    let mut spec = Map::new();
    spec.insert(
        "templateId".to_string(),
        Value::String(template_id.unwrap_or_default().to_string()),
    );
    if let Some(site_id) = site_id {
        spec.insert("siteId".to_string(), Value::String(site_id.to_string()));
    }
    if prepared {
        spec.insert("prepared".to_string(), Value::Bool(true));
    }
    if approved {
        spec.insert("approved".to_string(), Value::Bool(true));
    }

    let mut resource = Resource::new(&deployment_gvk(), DEPLOYMENT_RESOURCE_NAME);
    resource.set_path(&["spec"], Value::Object(spec));
    if prepared {
        resource.set_prepared(true);
    }
    if approved {
        resource.set_approved(true);
    }
    resource
}

/// Deployment record without its package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub deployment_id: String,
    pub parent_deployment_id: Option<String>,
    pub template_id: Option<String>,
    pub site_id: Option<String>,
    pub metadata: Metadata,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub prepared: bool,
    pub approved: bool,
}

/// A template instantiated at a site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub info: DeploymentInfo,
    pub package: Package,
}

impl Deployment {
    /// Creates an unsaved deployment; the store assigns the ID
    pub fn new(
        parent_deployment_id: Option<String>,
        template_id: Option<String>,
        site_id: Option<String>,
        prepared: bool,
        approved: bool,
        package: Package,
    ) -> Self {
        let now = super::now();
        Self {
            info: DeploymentInfo {
                deployment_id: String::new(),
                parent_deployment_id,
                template_id,
                site_id,
                metadata: Metadata::new(),
                created: now,
                updated: now,
                prepared,
                approved,
            },
            package,
        }
    }

    pub fn marker(&self) -> Option<&Resource> {
        find(&self.package, &deployment_resource_identifier())
    }

    /// Puts the template's package (prepared for merge) under this package
    pub fn merge_template(&mut self, template: &Template) {
        let mut metadata = template.info.metadata.clone();
        metadata.extend(std::mem::take(&mut self.info.metadata));
        self.info.metadata = metadata;

        let own = std::mem::take(&mut self.package);
        self.package = merge_package(prepare_package_for_merge(&template.package), own);
    }

    /// Writes the struct fields into the marker document
    pub fn merge_deployment_resource(&mut self) {
        let marker = new_deployment_resource(
            self.info.template_id.as_deref(),
            self.info.site_id.as_deref(),
            self.info.prepared,
            self.info.approved,
        );
        let package = std::mem::take(&mut self.package);
        self.package = merge_package(package, [marker]);
    }

    /// Derives metadata from the package on top of any explicit metadata
    pub fn update_metadata(&mut self) {
        update_metadata(&mut self.info.metadata, &self.package);
    }

    /// Changes the template reference in both the struct and the marker
    pub fn set_template_id(&mut self, template_id: Option<String>) {
        self.set_marker_field("templateId", template_id.as_deref());
        self.info.template_id = template_id;
    }

    /// Changes the site reference in both the struct and the marker
    pub fn set_site_id(&mut self, site_id: Option<String>) {
        self.set_marker_field("siteId", site_id.as_deref());
        self.info.site_id = site_id;
    }

    fn set_marker_field(&mut self, key: &str, value: Option<&str>) {
        let identifier = deployment_resource_identifier();
        let Some(marker) = self.package.iter_mut().find(|resource| resource.is(&identifier)) else {
            return;
        };
        if let Some(spec) = marker.map_at_mut(&["spec"]) {
            match value {
                Some(value) => {
                    spec.insert(key.to_string(), Value::String(value.to_string()));
                }
                None => {
                    spec.remove(key);
                }
            }
        }
    }

    /// Refreshes the struct fields from the marker document
    ///
    /// Returns false when the package has no marker, in which case nothing
    /// but (optionally) metadata is touched.
    pub fn update_from_package(&mut self, with_metadata: bool) -> bool {
        if with_metadata {
            self.update_metadata();
        }

        let Some(marker) = find(&self.package, &deployment_resource_identifier()) else {
            return false;
        };

        self.info.template_id = non_empty(marker.get_str(&["spec", "templateId"]));
        self.info.site_id = non_empty(marker.get_str(&["spec", "siteId"]));
        self.info.prepared =
            marker.is_prepared() || marker.get_bool(&["spec", "prepared"]).unwrap_or(false);
        self.info.approved =
            marker.is_approved() || marker.get_bool(&["spec", "approved"]).unwrap_or(false);
        true
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|value| !value.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::decode_package;

    #[test]
    fn test_marker_round_trip() {
        let mut deployment = Deployment::new(
            None,
            Some("edge".to_string()),
            Some("lab/1".to_string()),
            false,
            false,
            Package::new(),
        );
        deployment.merge_deployment_resource();

        let marker = deployment.marker().unwrap();
        assert_eq!(marker.get_str(&["spec", "templateId"]), Some("edge"));
        assert_eq!(marker.get_str(&["spec", "siteId"]), Some("lab/1"));
        assert!(!marker.is_prepared());

        deployment.info.template_id = None;
        assert!(deployment.update_from_package(false));
        assert_eq!(deployment.info.template_id.as_deref(), Some("edge"));
    }

    #[test]
    fn test_prepared_from_annotation_or_spec() {
        let mut deployment = Deployment::new(None, None, None, false, false, Package::new());
        deployment.package = decode_package(
            r#"
apiVersion: deployment.nephio.org/v1alpha1
kind: Deployment
metadata:
  name: deployment
  annotations:
    nephio.org/prepared: "true"
spec:
  templateId: edge
"#,
        )
        .unwrap();
        assert!(deployment.update_from_package(false));
        assert!(deployment.info.prepared);
        assert!(!deployment.info.approved);
        assert_eq!(deployment.info.site_id, None);

        deployment.package = decode_package(
            "apiVersion: deployment.nephio.org/v1alpha1\nkind: Deployment\nmetadata:\n  name: deployment\nspec:\n  templateId: edge\n  approved: true\n",
        )
        .unwrap();
        assert!(deployment.update_from_package(false));
        assert!(!deployment.info.prepared);
        assert!(deployment.info.approved);
    }

    #[test]
    fn test_set_site_id_keeps_marker_consistent() {
        let mut deployment = Deployment::new(
            None,
            Some("edge".to_string()),
            Some("lab/1".to_string()),
            true,
            false,
            Package::new(),
        );
        deployment.merge_deployment_resource();
        deployment.set_site_id(None);

        assert_eq!(deployment.info.site_id, None);
        assert_eq!(deployment.marker().unwrap().get_str(&["spec", "siteId"]), None);
        assert!(deployment.update_from_package(false));
        assert_eq!(deployment.info.site_id, None);
        assert!(deployment.info.prepared);
    }

    #[test]
    fn test_update_without_marker() {
        let mut deployment = Deployment::new(None, Some("t".to_string()), None, true, false, Package::new());
        assert!(!deployment.update_from_package(true));
        assert_eq!(deployment.info.template_id.as_deref(), Some("t"));
        assert!(deployment.info.prepared);
    }

    #[test]
    fn test_merge_template_places_template_first() {
        let template = Template::new(
            "edge",
            decode_package("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: base\n").unwrap(),
        );
        let mut deployment = Deployment::new(
            None,
            Some("edge".to_string()),
            None,
            false,
            false,
            decode_package("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: extra\n").unwrap(),
        );
        deployment.merge_template(&template);
        deployment.merge_deployment_resource();

        let names: Vec<_> = deployment.package.iter().filter_map(|r| r.name()).collect();
        assert_eq!(names, vec!["base", "extra", "deployment"]);
    }
}
