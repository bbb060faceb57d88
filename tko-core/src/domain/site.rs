//! Site domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::template::Template;
use crate::resource::Package;
use crate::resource::merge::{merge_package, prepare_package_for_merge};
use crate::resource::metadata::{Metadata, update_metadata};

/// Site record without its package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub site_id: String,
    /// A site may itself be built from a template
    pub template_id: Option<String>,
    pub metadata: Metadata,
    pub updated: DateTime<Utc>,
    /// Deployments currently placed at this site
    pub deployment_ids: BTreeSet<String>,
}

impl SiteInfo {
    pub fn new(site_id: impl Into<String>, template_id: Option<String>) -> Self {
        Self {
            site_id: site_id.into(),
            template_id,
            metadata: Metadata::new(),
            updated: super::now(),
            deployment_ids: BTreeSet::new(),
        }
    }
}

/// Place deployments are instantiated at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub info: SiteInfo,
    pub package: Package,
}

impl Site {
    pub fn new(site_id: impl Into<String>, template_id: Option<String>, package: Package) -> Self {
        Self {
            info: SiteInfo::new(site_id, template_id),
            package,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.info.metadata.insert(key.into(), value.into());
        self
    }

    /// Rebuilds this site on top of its template
    ///
    /// The template's package (prepared for merge) comes first and the site's
    /// own resources are merged over it. Metadata starts from the template's
    /// and the site's own entries win.
    pub fn merge_template(&mut self, template: &Template) {
        let mut metadata = template.info.metadata.clone();
        metadata.extend(std::mem::take(&mut self.info.metadata));
        self.info.metadata = metadata;

        let own = std::mem::take(&mut self.package);
        self.package = merge_package(prepare_package_for_merge(&template.package), own);
    }

    pub fn update_from_package(&mut self) {
        update_metadata(&mut self.info.metadata, &self.package);
    }
}
