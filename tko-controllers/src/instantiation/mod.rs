//! Instantiation
//!
//! Each pass walks every site and, for each resource in the site's package,
//! runs the instantiator registered for its GVK. Instantiators resolve from
//! the in-process registry first and from `instantiate` plugins second;
//! resources with neither are skipped.

mod context;
mod plugins;
mod sites;

pub use context::InstantiationContext;
pub use plugins::{CommandInstantiator, InstantiateInput, InstantiateOutput};

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

use tko_backend::Backend;
use tko_core::Gvk;
use tko_core::domain::plugin::PluginType;

use crate::controller::Reconciler;
use crate::plugins::{PluginSettings, find_plugin};

/// Acts on one site resource
#[async_trait]
pub trait Instantiator: Send + Sync {
    async fn instantiate(&self, context: &InstantiationContext) -> Result<()>;
}

/// Instantiation reconciler
pub struct Instantiation {
    backend: Arc<dyn Backend>,
    settings: PluginSettings,
    instantiators: HashMap<Gvk, Arc<dyn Instantiator>>,
}

impl Instantiation {
    pub fn new(backend: Arc<dyn Backend>, settings: PluginSettings) -> Self {
        Self {
            backend,
            settings,
            instantiators: HashMap::new(),
        }
    }

    /// Registers an in-process instantiator, shadowing any plugin
    pub fn register_instantiator(&mut self, gvk: Gvk, instantiator: Arc<dyn Instantiator>) {
        self.instantiators.insert(gvk, instantiator);
    }

    /// Finds the instantiator for a GVK, `None` when there is nothing to run
    pub async fn instantiator(&self, gvk: &Gvk) -> Result<Option<Arc<dyn Instantiator>>> {
        if let Some(instantiator) = self.instantiators.get(gvk) {
            return Ok(Some(instantiator.clone()));
        }

        match find_plugin(self.backend.as_ref(), PluginType::Instantiate, gvk).await? {
            Some(plugin) => {
                let instantiator = CommandInstantiator::new(plugin, self.settings.clone())?;
                Ok(Some(Arc::new(instantiator)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Reconciler for Instantiation {
    async fn run(&self) -> Result<()> {
        // Listing failures only cost this pass.
        if let Err(err) = self.instantiate_sites().await {
            error!("Instantiation pass failed: {:#}", err);
        }
        Ok(())
    }
}
