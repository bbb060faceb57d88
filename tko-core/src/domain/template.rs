//! Template domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::resource::Package;
use crate::resource::metadata::{Metadata, update_metadata};

/// Template record without its package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub template_id: String,
    pub metadata: Metadata,
    pub updated: DateTime<Utc>,
    /// Deployments currently created from this template
    pub deployment_ids: BTreeSet<String>,
}

impl TemplateInfo {
    pub fn new(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            metadata: Metadata::new(),
            updated: super::now(),
            deployment_ids: BTreeSet::new(),
        }
    }
}

/// Reusable package a site or deployment is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub info: TemplateInfo,
    pub package: Package,
}

impl Template {
    pub fn new(template_id: impl Into<String>, package: Package) -> Self {
        Self {
            info: TemplateInfo::new(template_id),
            package,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.info.metadata.insert(key.into(), value.into());
        self
    }

    /// Derives metadata from the package on top of any explicit metadata
    pub fn update_from_package(&mut self) {
        update_metadata(&mut self.info.metadata, &self.package);
    }
}
