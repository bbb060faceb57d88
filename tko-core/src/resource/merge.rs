//! Resource merge engine
//!
//! Packages are composed by identity. An incoming resource replaces the
//! existing resource with the same GVK+name in place, or is appended when
//! there is none. The `nephio.org/merge: Override` annotation switches from
//! whole-document replacement to a recursive value merge, and
//! `nephio.org/rename` retargets the merge at a different name.

use serde_json::{Value, json};

use super::annotations::MergeMode;
use super::{Package, Resource, object_reference_identifier};
use crate::error::{Result, TkoError};

/// Merges resources into a package
///
/// Untouched entries keep their positions. Resources without an identity
/// cannot be matched and are dropped.
pub fn merge_package(mut package: Package, incoming: impl IntoIterator<Item = Resource>) -> Package {
    for mut resource in incoming {
        let Some(mut identifier) = resource.identifier() else {
            continue;
        };

        let mode = resource.merge_mode();

        if let Some(rename) = resource.rename().map(str::to_string) {
            resource.set_path(&["metadata", "name"], json!(rename));
            identifier.name = rename;
        }

        match package.iter().position(|existing| existing.is(&identifier)) {
            Some(index) => match mode {
                MergeMode::Override => {
                    let mut merged = package[index].clone().into_value();
                    merge_values(&mut merged, resource.into_value());
                    if let Some(merged) = Resource::from_value(merged) {
                        package[index] = merged;
                    }
                }
                MergeMode::Replace => package[index] = resource,
            },
            None => package.push(resource),
        }
    }
    package
}

/// Recursively merges `overlay` into `base`
///
/// Maps merge key by key; any other overlay value overwrites.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Deep-copies a package and moves its directives one level down
///
/// Used whenever a template or site package is merged into something built
/// from it.
pub fn prepare_package_for_merge(package: &[Resource]) -> Package {
    package
        .iter()
        .cloned()
        .map(|mut resource| {
            resource.update_annotations_for_merge();
            resource
        })
        .collect()
}

/// Collects the resources named by `{apiVersion, kind, name}` references
pub fn referent_package(references: &[Value], package: &[Resource]) -> Result<Package> {
    let mut referents = Package::with_capacity(references.len());
    for reference in references {
        if !reference.is_object() {
            return Err(TkoError::bad_argument(format!(
                "object reference not a map: {}",
                reference
            )));
        }
        let identifier = object_reference_identifier(reference).ok_or_else(|| {
            TkoError::bad_argument(format!("malformed object reference: {}", reference))
        })?;
        let resource = super::find(package, &identifier).ok_or_else(|| {
            TkoError::not_found(format!("object reference: {}", identifier))
        })?;
        referents.push(resource.clone());
    }
    Ok(referents)
}
