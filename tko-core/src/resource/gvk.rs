//! Group/Version/Kind and resource identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema family of a resource
///
/// An empty group stands for the default (core) group, in which case the
/// API version is just the version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Gvk {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Builds a GVK from an `apiVersion` string and a kind
    pub fn from_api_version(api_version: &str, kind: impl Into<String>) -> Self {
        let (group, version) = parse_api_version(api_version);
        Self::new(group, version, kind)
    }

    /// `group/version`, or just `version` for the default group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Identifier for a named resource of this GVK
    pub fn identifier(&self, name: impl Into<String>) -> ResourceIdentifier {
        ResourceIdentifier {
            gvk: self.clone(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "apiVersion: {}, kind: {}", self.api_version(), self.kind)
    }
}

/// Splits an `apiVersion` on its first `/` into (group, version)
pub fn parse_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

/// GVK + name: the identity of a resource within a package
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(flatten)]
    pub gvk: Gvk,
    pub name: String,
}

impl ResourceIdentifier {
    pub fn new(gvk: Gvk, name: impl Into<String>) -> Self {
        Self {
            gvk,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, name: {}", self.gvk, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_version() {
        assert_eq!(
            parse_api_version("topology.nephio.org/v1alpha1"),
            ("topology.nephio.org", "v1alpha1")
        );
        assert_eq!(parse_api_version("v1"), ("", "v1"));
        assert_eq!(parse_api_version("a/b/c"), ("a", "b/c"));
    }

    #[test]
    fn test_api_version_round_trip_default_group() {
        let gvk = Gvk::from_api_version("v1", "ConfigMap");
        assert_eq!(gvk.group, "");
        assert_eq!(gvk.api_version(), "v1");
    }

    #[test]
    fn test_identifier_display() {
        let identifier = Gvk::new("deployment.nephio.org", "v1alpha1", "Deployment").identifier("deployment");
        assert_eq!(
            identifier.to_string(),
            "apiVersion: deployment.nephio.org/v1alpha1, kind: Deployment, name: deployment"
        );
    }

    #[test]
    fn test_identifier_serializes_flat() {
        let identifier = Gvk::new("g", "v", "K").identifier("n");
        let value = serde_json::to_value(&identifier).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"group": "g", "version": "v", "kind": "K", "name": "n"})
        );
    }
}
