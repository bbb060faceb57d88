//! Plugin DTOs

use serde::{Deserialize, Serialize};

use crate::resource::Gvk;

/// Filter for listing or purging plugins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectPlugins {
    pub plugin_type: Option<String>,
    #[serde(default)]
    pub name_patterns: Vec<String>,
    pub executor: Option<String>,
    pub trigger: Option<Gvk>,
}

impl SelectPlugins {
    pub fn of_type(plugin_type: impl Into<String>) -> Self {
        Self {
            plugin_type: Some(plugin_type.into()),
            ..Self::default()
        }
    }

    pub fn with_trigger(mut self, trigger: Gvk) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn with_executor(mut self, executor: impl Into<String>) -> Self {
        self.executor = Some(executor.into());
        self
    }

    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_patterns.push(pattern.into());
        self
    }
}
