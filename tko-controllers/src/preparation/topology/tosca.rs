use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use tko_core::resource::merge::merge_package;
use tko_core::resource::{find_mut, object_reference};
use tko_core::{Package, Resource, ResourceIdentifier};

use super::placement_gvk;
use crate::preparation::{PreparationContext, Preparer};

/// Name of the Placement resource generated from a topology
pub const PLACEMENT_NAME: &str = "placement";

/// Resources and placements extracted from a topology document
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub resources: Package,
    pub placements: Vec<PlacementTemplate>,
}

/// One `spec.templates` entry of the generated Placement
#[derive(Debug, Clone)]
pub struct PlacementTemplate {
    /// Name of a Template resource
    pub template: String,
    /// Names of Site resources
    pub sites: Vec<String>,
    pub merge: Vec<ResourceIdentifier>,
}

impl PlacementTemplate {
    fn to_value(&self) -> Value {
        json!({
            "template": self.template,
            "sites": self.sites,
            "merge": self.merge.iter().map(object_reference).collect::<Vec<_>>(),
        })
    }
}

/// Turns a topology document into resources
#[async_trait]
pub trait TopologyParser: Send + Sync {
    async fn parse(&self, url: &str) -> Result<Topology>;
}

/// Expands the topology at `spec.url` into the deployment's package
///
/// The parsed resources are merged in together with a Placement tying its
/// templates to its sites.
pub struct ToscaPreparer {
    parser: Arc<dyn TopologyParser>,
}

impl ToscaPreparer {
    pub fn new(parser: Arc<dyn TopologyParser>) -> Self {
        Self { parser }
    }
}

#[async_trait]
impl Preparer for ToscaPreparer {
    async fn prepare(&self, context: &PreparationContext<'_>) -> Result<Option<Package>> {
        info!("preparing TOSCA: {}", context.target.name);
        let Some(resource) = context.target_resource() else {
            return Ok(None);
        };
        let url = resource
            .get_str(&["spec", "url"])
            .context("TOSCA resource has no spec.url")?;

        let topology = self
            .parser
            .parse(url)
            .await
            .with_context(|| format!("parse {}", url))?;

        let mut placement = Resource::new(&placement_gvk(), PLACEMENT_NAME);
        let templates = topology
            .placements
            .iter()
            .map(PlacementTemplate::to_value)
            .collect();
        if !placement.set_path(&["spec", "templates"], Value::Array(templates)) {
            bail!("malformed Placement resource");
        }

        let mut package = merge_package(context.package.clone(), topology.resources);
        package = merge_package(package, [placement]);

        let tosca = find_mut(&mut package, &context.target).context("TOSCA resource disappeared")?;
        if !tosca.set_prepared(true) {
            bail!("malformed TOSCA resource");
        }
        Ok(Some(package))
    }
}
