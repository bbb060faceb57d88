//! Annotation directives carried in `metadata.annotations`

use serde_json::Value;

use super::Resource;

pub const METADATA_ANNOTATION: &str = "nephio.org/metadata";
pub const MERGE_ANNOTATION: &str = "nephio.org/merge";
pub const RENAME_ANNOTATION: &str = "nephio.org/rename";
pub const PREPARE_ANNOTATION: &str = "nephio.org/prepare";
pub const PREPARED_ANNOTATION: &str = "nephio.org/prepared";
pub const APPROVED_ANNOTATION: &str = "nephio.org/approved";

/// Scope directive used by the metadata and prepare annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Never applies, here or downstream
    Never,
    /// Applies at this level
    Here,
    /// Applies one level down
    Postpone,
}

impl Directive {
    /// An empty value counts as `Here`; unknown values yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Here" | "" => Some(Self::Here),
            "Never" => Some(Self::Never),
            "Postpone" => Some(Self::Postpone),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Never => "Never",
            Self::Here => "Here",
            Self::Postpone => "Postpone",
        }
    }

    /// Directive to carry once the resource is merged one level down
    pub fn for_merge(self) -> Self {
        match self {
            Self::Here => Self::Never,
            Self::Postpone => Self::Here,
            Self::Never => Self::Never,
        }
    }
}

/// How an incoming resource combines with an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    #[default]
    Replace,
    Override,
}

impl Resource {
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.get_str(&["metadata", "annotations", key])
    }

    /// Sets an annotation, creating `metadata.annotations` as needed
    ///
    /// Returns false if the resource is malformed.
    pub fn set_annotation(&mut self, key: &str, value: &str) -> bool {
        self.set_path(
            &["metadata", "annotations", key],
            Value::String(value.to_string()),
        )
    }

    pub fn remove_annotation(&mut self, key: &str) {
        if let Some(annotations) = self
            .as_map_mut()
            .get_mut("metadata")
            .and_then(Value::as_object_mut)
            .and_then(|metadata| metadata.get_mut("annotations"))
            .and_then(Value::as_object_mut)
        {
            annotations.remove(key);
        }
    }

    pub fn metadata_directive(&self) -> Option<Directive> {
        self.annotation(METADATA_ANNOTATION).and_then(Directive::parse)
    }

    pub fn prepare_directive(&self) -> Option<Directive> {
        self.annotation(PREPARE_ANNOTATION).and_then(Directive::parse)
    }

    pub fn merge_mode(&self) -> MergeMode {
        match self.annotation(MERGE_ANNOTATION) {
            Some("Override") => MergeMode::Override,
            _ => MergeMode::Replace,
        }
    }

    pub fn rename(&self) -> Option<&str> {
        self.annotation(RENAME_ANNOTATION)
    }

    pub fn is_prepared(&self) -> bool {
        self.annotation(PREPARED_ANNOTATION) == Some("true")
    }

    pub fn set_prepared(&mut self, prepared: bool) -> bool {
        self.set_flag(PREPARED_ANNOTATION, prepared)
    }

    pub fn is_approved(&self) -> bool {
        self.annotation(APPROVED_ANNOTATION) == Some("true")
    }

    pub fn set_approved(&mut self, approved: bool) -> bool {
        self.set_flag(APPROVED_ANNOTATION, approved)
    }

    fn set_flag(&mut self, key: &str, value: bool) -> bool {
        if value {
            self.set_annotation(key, "true")
        } else {
            self.remove_annotation(key);
            true
        }
    }

    /// Moves the metadata and prepare directives one level down
    ///
    /// A missing directive counts as `Here` and becomes `Never`; an unknown
    /// one is left alone.
    pub fn update_annotations_for_merge(&mut self) {
        for key in [METADATA_ANNOTATION, PREPARE_ANNOTATION] {
            let directive = match self.annotation(key) {
                Some(value) => Directive::parse(value),
                None => Some(Directive::Here),
            };
            if let Some(directive) = directive {
                self.set_annotation(key, directive.for_merge().as_str());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Gvk;

    fn resource() -> Resource {
        Resource::new(&Gvk::new("example.org", "v1", "Thing"), "thing")
    }

    #[test]
    fn test_directive_for_merge() {
        assert_eq!(Directive::Here.for_merge(), Directive::Never);
        assert_eq!(Directive::Postpone.for_merge(), Directive::Here);
        assert_eq!(Directive::Never.for_merge(), Directive::Never);
    }

    #[test]
    fn test_empty_directive_is_here() {
        assert_eq!(Directive::parse(""), Some(Directive::Here));
        assert_eq!(Directive::parse("Later"), None);
    }

    #[test]
    fn test_prepared_flag() {
        let mut resource = resource();
        assert!(!resource.is_prepared());
        assert!(resource.set_prepared(true));
        assert!(resource.is_prepared());
        assert!(resource.set_prepared(false));
        assert!(!resource.is_prepared());
    }

    #[test]
    fn test_merge_mode() {
        let mut resource = resource();
        assert_eq!(resource.merge_mode(), MergeMode::Replace);
        resource.set_annotation(MERGE_ANNOTATION, "Override");
        assert_eq!(resource.merge_mode(), MergeMode::Override);
    }

    #[test]
    fn test_update_annotations_for_merge() {
        let mut resource = resource();
        resource.set_annotation(METADATA_ANNOTATION, "Postpone");
        resource.set_annotation(PREPARE_ANNOTATION, "");
        resource.update_annotations_for_merge();
        assert_eq!(resource.metadata_directive(), Some(Directive::Here));
        assert_eq!(resource.annotation(PREPARE_ANNOTATION), Some("Never"));
    }

    #[test]
    fn test_update_annotations_without_directives() {
        let mut resource = resource();
        resource.update_annotations_for_merge();
        assert_eq!(resource.metadata_directive(), Some(Directive::Never));
        assert_eq!(resource.prepare_directive(), Some(Directive::Never));
    }

    #[test]
    fn test_unknown_directive_is_left_alone() {
        let mut resource = resource();
        resource.set_annotation(PREPARE_ANNOTATION, "Later");
        resource.update_annotations_for_merge();
        assert_eq!(resource.annotation(PREPARE_ANNOTATION), Some("Later"));
    }

    #[test]
    fn test_never_is_kept() {
        let mut resource = resource();
        resource.set_annotation(PREPARE_ANNOTATION, "Never");
        resource.update_annotations_for_merge();
        resource.update_annotations_for_merge();
        assert_eq!(resource.prepare_directive(), Some(Directive::Never));
    }
}
