use tko_core::Resource;

use super::template_gvk;

/// Template ID named by a package's Template resource
pub fn template_id<'a>(package: &'a [Resource], name: &str) -> Option<&'a str> {
    tko_core::resource::find(package, &template_gvk().identifier(name))
        .and_then(|template| template.get_str(&["spec", "explicit", "id"]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tko_core::resource::decode_package;

    #[test]
    fn test_template_id() {
        let package = decode_package(
            r#"
apiVersion: topology.nephio.org/v1alpha1
kind: Template
metadata:
  name: edge
spec:
  explicit:
    id: demo/edge
---
apiVersion: topology.nephio.org/v1alpha1
kind: Template
metadata:
  name: implicit
spec: {}
"#,
        )
        .unwrap();

        assert_eq!(template_id(&package, "edge"), Some("demo/edge"));
        assert_eq!(template_id(&package, "implicit"), None);
        assert_eq!(template_id(&package, "missing"), None);
    }
}
