//! Plugin domain types
//!
//! A plugin binds a handler type ("instantiate", "prepare", "validate") and
//! a name to an executor, e.g. a command to run, and the GVKs it triggers on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::TkoError;
use crate::resource::Gvk;

/// Separator between type and name in a plugin ID
pub const PLUGIN_ID_SEPARATOR: char = '|';

/// Executor that runs a local command
pub const COMMAND_EXECUTOR: &str = "command";

/// Handler role of a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Validate,
    Prepare,
    Instantiate,
}

impl PluginType {
    pub const ALL: [PluginType; 3] = [Self::Validate, Self::Prepare, Self::Instantiate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Prepare => "prepare",
            Self::Instantiate => "instantiate",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginType {
    type Err = TkoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|plugin_type| plugin_type.as_str() == value)
            .ok_or_else(|| {
                TkoError::bad_argument(format!(
                    "plugin type must be \"validate\", \"prepare\", or \"instantiate\": {}",
                    value
                ))
            })
    }
}

/// `<type>|<name>`
///
/// The type is kept as a string so that malformed input can reach the
/// validating backend and be rejected there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PluginId {
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub name: String,
}

impl PluginId {
    pub fn new(plugin_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            plugin_type: plugin_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.plugin_type, PLUGIN_ID_SEPARATOR, self.name)
    }
}

impl FromStr for PluginId {
    type Err = TkoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .split_once(PLUGIN_ID_SEPARATOR)
            .map(|(plugin_type, name)| Self::new(plugin_type, name))
            .ok_or_else(|| TkoError::bad_argument(format!("malformed plugin id: {}", value)))
    }
}

/// Registered handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub plugin_id: PluginId,
    pub executor: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
    #[serde(default)]
    pub triggers: Vec<Gvk>,
}

impl Plugin {
    pub fn new(plugin_id: PluginId, executor: impl Into<String>) -> Self {
        Self {
            plugin_id,
            executor: executor.into(),
            arguments: Vec::new(),
            properties: HashMap::new(),
            triggers: Vec::new(),
        }
    }

    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_trigger(mut self, gvk: Gvk) -> Self {
        self.triggers.push(gvk);
        self
    }

    pub fn has_trigger(&self, gvk: &Gvk) -> bool {
        self.triggers.contains(gvk)
    }
}
