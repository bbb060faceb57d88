//! Template DTOs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Filter for listing or purging templates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectTemplates {
    #[serde(default)]
    pub template_id_patterns: Vec<String>,
    #[serde(default)]
    pub metadata_patterns: HashMap<String, String>,
}

impl SelectTemplates {
    pub fn with_id_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.template_id_patterns.push(pattern.into());
        self
    }

    pub fn with_metadata_pattern(mut self, key: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.metadata_patterns.insert(key.into(), pattern.into());
        self
    }
}
