//! Semi-structured resource documents
//!
//! A resource is a YAML/JSON map that carries at least `apiVersion` and
//! `kind`, usually `metadata.name` and `metadata.annotations`. A package is
//! an ordered list of resources with unique identities.

pub mod annotations;
pub mod gvk;
pub mod merge;
pub mod metadata;

pub use gvk::{Gvk, ResourceIdentifier, parse_api_version};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered, identity-deduplicated list of resources
pub type Package = Vec<Resource>;

/// One document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(Map<String, Value>);

impl Resource {
    /// Creates a resource with `apiVersion`, `kind` and `metadata.name` set
    pub fn new(gvk: &Gvk, name: &str) -> Self {
        let mut map = Map::new();
        map.insert("apiVersion".to_string(), Value::String(gvk.api_version()));
        map.insert("kind".to_string(), Value::String(gvk.kind.clone()));
        let mut metadata = Map::new();
        metadata.insert("name".to_string(), Value::String(name.to_string()));
        map.insert("metadata".to_string(), Value::Object(metadata));
        Self(map)
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Wraps a value if it is a map
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Parses a single YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn gvk(&self) -> Option<Gvk> {
        let api_version = self.0.get("apiVersion")?.as_str()?;
        let kind = self.0.get("kind")?.as_str()?;
        Some(Gvk::from_api_version(api_version, kind))
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str(&["metadata", "name"])
    }

    /// GVK + name, if the resource is well-formed enough to have one
    pub fn identifier(&self) -> Option<ResourceIdentifier> {
        let gvk = self.gvk()?;
        let name = self.name()?;
        Some(ResourceIdentifier::new(gvk, name))
    }

    pub fn is(&self, identifier: &ResourceIdentifier) -> bool {
        self.identifier().as_ref() == Some(identifier)
    }

    /// Walks nested maps
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut value = self.0.get(*first)?;
        for key in rest {
            value = value.as_object()?.get(*key)?;
        }
        Some(value)
    }

    pub fn get_str(&self, path: &[&str]) -> Option<&str> {
        self.get_path(path)?.as_str()
    }

    pub fn get_bool(&self, path: &[&str]) -> Option<bool> {
        self.get_path(path)?.as_bool()
    }

    pub fn get_map(&self, path: &[&str]) -> Option<&Map<String, Value>> {
        self.get_path(path)?.as_object()
    }

    pub fn get_list(&self, path: &[&str]) -> Option<&Vec<Value>> {
        self.get_path(path)?.as_array()
    }

    /// Returns the map at `path`, creating missing maps on the way
    ///
    /// Returns `None` if an existing value on the path is not a map.
    pub fn map_at_mut(&mut self, path: &[&str]) -> Option<&mut Map<String, Value>> {
        let mut map = &mut self.0;
        for key in path {
            map = map
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()?;
        }
        Some(map)
    }

    /// Sets the value at `path`, creating intermediate maps
    ///
    /// Returns false if an intermediate value exists and is not a map.
    pub fn set_path(&mut self, path: &[&str], value: Value) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };
        match self.map_at_mut(parents) {
            Some(map) => {
                map.insert(last.to_string(), value);
                true
            }
            None => false,
        }
    }
}

/// Finds the first resource with the given identity
pub fn find<'a>(package: &'a [Resource], identifier: &ResourceIdentifier) -> Option<&'a Resource> {
    package.iter().find(|resource| resource.is(identifier))
}

pub fn find_mut<'a>(
    package: &'a mut [Resource],
    identifier: &ResourceIdentifier,
) -> Option<&'a mut Resource> {
    package.iter_mut().find(|resource| resource.is(identifier))
}

/// Parses a multi-document YAML stream into a package
///
/// Empty documents are skipped.
pub fn decode_package(yaml: &str) -> Result<Package, serde_yaml::Error> {
    let mut package = Package::new();
    for document in serde_yaml::Deserializer::from_str(yaml) {
        let value = Value::deserialize(document)?;
        if let Value::Object(map) = value {
            package.push(Resource(map));
        }
    }
    Ok(package)
}

/// Identity of an `{apiVersion, kind, name}` object reference
pub fn object_reference_identifier(reference: &Value) -> Option<ResourceIdentifier> {
    let reference = reference.as_object()?;
    let api_version = reference.get("apiVersion")?.as_str()?;
    let kind = reference.get("kind")?.as_str()?;
    let name = reference.get("name")?.as_str()?;
    Some(ResourceIdentifier::new(
        Gvk::from_api_version(api_version, kind),
        name,
    ))
}

/// Builds an `{apiVersion, kind, name}` object reference
pub fn object_reference(identifier: &ResourceIdentifier) -> Value {
    serde_json::json!({
        "apiVersion": identifier.gvk.api_version(),
        "kind": identifier.gvk.kind,
        "name": identifier.name,
    })
}
