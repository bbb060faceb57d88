//! Topology preparers
//!
//! In-process preparers for the `topology.nephio.org` resources: Placement
//! fans a deployment out into child deployments, Site resolves or provisions
//! a site, and TOSCA expands a topology document into both.

mod placement;
mod site;
mod template;
mod tosca;

pub use placement::PlacementPreparer;
pub use site::SitePreparer;
pub use template::template_id;
pub use tosca::{PlacementTemplate, Topology, TopologyParser, ToscaPreparer};

use std::sync::Arc;

use tko_core::Gvk;

use super::Preparation;

pub const TOPOLOGY_GROUP: &str = "topology.nephio.org";
pub const TOPOLOGY_VERSION: &str = "v1alpha1";

pub fn placement_gvk() -> Gvk {
    Gvk::new(TOPOLOGY_GROUP, TOPOLOGY_VERSION, "Placement")
}

pub fn site_gvk() -> Gvk {
    Gvk::new(TOPOLOGY_GROUP, TOPOLOGY_VERSION, "Site")
}

pub fn template_gvk() -> Gvk {
    Gvk::new(TOPOLOGY_GROUP, TOPOLOGY_VERSION, "Template")
}

pub fn tosca_gvk() -> Gvk {
    Gvk::new(TOPOLOGY_GROUP, TOPOLOGY_VERSION, "TOSCA")
}

/// Registers the topology preparers
///
/// TOSCA is only handled when a parser is supplied.
pub fn register_topology_preparers(
    preparation: &mut Preparation,
    parser: Option<Arc<dyn TopologyParser>>,
) {
    preparation.register_preparer(placement_gvk(), Arc::new(PlacementPreparer));
    preparation.register_preparer(site_gvk(), Arc::new(SitePreparer));
    if let Some(parser) = parser {
        preparation.register_preparer(tosca_gvk(), Arc::new(ToscaPreparer::new(parser)));
    }
}
