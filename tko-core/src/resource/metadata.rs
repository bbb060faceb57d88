//! Metadata extraction
//!
//! Resources in the `metadata.nephio.org` group contribute their `spec` to
//! the owning entity's flat metadata map, keyed `<Kind>.<path.to.leaf>`.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::Resource;
use super::annotations::Directive;

/// Group whose resources contribute metadata
pub const METADATA_GROUP: &str = "metadata.nephio.org";

/// Flat, queryable metadata of an entity
pub type Metadata = HashMap<String, String>;

/// Flattens the `spec` of every contributing resource into `metadata`
pub fn update_metadata(metadata: &mut Metadata, package: &[Resource]) {
    for resource in package {
        let Some(gvk) = resource.gvk() else {
            continue;
        };
        if gvk.group != METADATA_GROUP {
            continue;
        }
        if matches!(
            resource.metadata_directive(),
            Some(Directive::Never | Directive::Postpone)
        ) {
            continue;
        }
        if let Some(spec) = resource.get_map(&["spec"]) {
            flatten(metadata, &format!("{}.", gvk.kind), spec);
        }
    }
}

fn flatten(metadata: &mut Metadata, prefix: &str, values: &Map<String, Value>) {
    for (key, value) in values {
        match value {
            Value::Object(nested) => flatten(metadata, &format!("{}{}.", prefix, key), nested),
            _ => {
                metadata.insert(format!("{}{}", prefix, key), value_to_string(value));
            }
        }
    }
}

/// Renders a leaf value the way metadata filters see it
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(string) => string.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::annotations::METADATA_ANNOTATION;
    use crate::resource::decode_package;

    #[test]
    fn test_nested_key_path() {
        let package = decode_package(
            r#"
apiVersion: metadata.nephio.org/v1alpha1
kind: Foo
metadata:
  name: foo
spec:
  a:
    b: x
  count: 3
  enabled: true
"#,
        )
        .unwrap();

        let mut metadata = Metadata::new();
        update_metadata(&mut metadata, &package);
        assert_eq!(metadata.get("Foo.a.b"), Some(&"x".to_string()));
        assert_eq!(metadata.get("Foo.count"), Some(&"3".to_string()));
        assert_eq!(metadata.get("Foo.enabled"), Some(&"true".to_string()));
    }

    #[test]
    fn test_other_groups_ignored() {
        let package = decode_package(
            "apiVersion: example.org/v1\nkind: Foo\nmetadata:\n  name: foo\nspec:\n  a: x\n",
        )
        .unwrap();
        let mut metadata = Metadata::new();
        update_metadata(&mut metadata, &package);
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_postponed_and_never_skipped() {
        let mut package = decode_package(
            "apiVersion: metadata.nephio.org/v1alpha1\nkind: Site\nmetadata:\n  name: s\nspec:\n  region: eu\n",
        )
        .unwrap();

        for directive in ["Postpone", "Never"] {
            package[0].set_annotation(METADATA_ANNOTATION, directive);
            let mut metadata = Metadata::new();
            update_metadata(&mut metadata, &package);
            assert!(metadata.is_empty(), "{} should be skipped", directive);
        }

        package[0].set_annotation(METADATA_ANNOTATION, "Here");
        let mut metadata = Metadata::new();
        update_metadata(&mut metadata, &package);
        assert_eq!(metadata.get("Site.region"), Some(&"eu".to_string()));
    }
}
