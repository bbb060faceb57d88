//! Deployment DTOs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::deployment::Deployment;

/// Filter for listing or purging deployments
///
/// Template and site filters only match deployments whose template or site
/// still exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectDeployments {
    pub parent_deployment_id: Option<String>,
    pub prepared: Option<bool>,
    pub approved: Option<bool>,
    #[serde(default)]
    pub metadata_patterns: HashMap<String, String>,
    #[serde(default)]
    pub template_id_patterns: Vec<String>,
    #[serde(default)]
    pub template_metadata_patterns: HashMap<String, String>,
    #[serde(default)]
    pub site_id_patterns: Vec<String>,
    #[serde(default)]
    pub site_metadata_patterns: HashMap<String, String>,
}

impl SelectDeployments {
    pub fn prepared(mut self, prepared: bool) -> Self {
        self.prepared = Some(prepared);
        self
    }

    pub fn approved(mut self, approved: bool) -> Self {
        self.approved = Some(approved);
        self
    }

    pub fn with_parent(mut self, parent_deployment_id: impl Into<String>) -> Self {
        self.parent_deployment_id = Some(parent_deployment_id.into());
        self
    }

    pub fn with_template_id_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.template_id_patterns.push(pattern.into());
        self
    }

    pub fn with_site_id_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.site_id_patterns.push(pattern.into());
        self
    }

    pub fn with_metadata_pattern(mut self, key: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.metadata_patterns.insert(key.into(), pattern.into());
        self
    }

    pub fn with_site_metadata_pattern(
        mut self,
        key: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        self.site_metadata_patterns.insert(key.into(), pattern.into());
        self
    }
}

/// A granted modification: the token plus a snapshot of the deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartedModification {
    pub modification_token: String,
    pub deployment: Deployment,
}
