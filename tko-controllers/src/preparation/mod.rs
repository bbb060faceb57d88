//! Preparation
//!
//! Each pass picks up every deployment that is not yet prepared and runs the
//! preparer of each resource that still needs one, one modification per
//! resource. Once nothing is left to prepare, a final modification runs
//! complete validation and marks the deployment prepared.

mod context;
mod deployments;
mod plugins;
mod resources;
pub mod topology;

pub use context::PreparationContext;
pub use plugins::{CommandPreparer, PrepareInput, PrepareOutput};

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

use tko_backend::{Backend, Validation};
use tko_core::domain::plugin::PluginType;
use tko_core::{Gvk, Package};

use crate::controller::Reconciler;
use crate::plugins::{PluginSettings, find_plugin};

/// Prepares one resource of a deployment
///
/// Returns the deployment's new package, or `None` to leave it untouched.
#[async_trait]
pub trait Preparer: Send + Sync {
    async fn prepare(&self, context: &PreparationContext<'_>) -> Result<Option<Package>>;
}

/// Preparation reconciler
pub struct Preparation {
    backend: Arc<dyn Backend>,
    validation: Arc<dyn Validation>,
    settings: PluginSettings,
    auto_approve: bool,
    preparers: HashMap<Gvk, Arc<dyn Preparer>>,
}

impl Preparation {
    /// # Arguments
    /// * `backend` - Store holding the deployments
    /// * `validation` - Complete validation run before a deployment is marked prepared
    /// * `settings` - Passed to command plugins
    pub fn new(
        backend: Arc<dyn Backend>,
        validation: Arc<dyn Validation>,
        settings: PluginSettings,
    ) -> Self {
        Self {
            backend,
            validation,
            settings,
            auto_approve: false,
            preparers: HashMap::new(),
        }
    }

    /// Also approve deployments when marking them prepared
    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    /// Registers an in-process preparer, shadowing any plugin
    pub fn register_preparer(&mut self, gvk: Gvk, preparer: Arc<dyn Preparer>) {
        self.preparers.insert(gvk, preparer);
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Finds the preparer for a GVK, `None` when there is none
    pub async fn preparer(&self, gvk: &Gvk) -> Result<Option<Arc<dyn Preparer>>> {
        if let Some(preparer) = self.preparers.get(gvk) {
            return Ok(Some(preparer.clone()));
        }

        match find_plugin(self.backend.as_ref(), PluginType::Prepare, gvk).await? {
            Some(plugin) => {
                let preparer = CommandPreparer::new(plugin, self.settings.clone())?;
                Ok(Some(Arc::new(preparer)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Reconciler for Preparation {
    async fn run(&self) -> Result<()> {
        if let Err(err) = self.prepare_deployments().await {
            error!("Preparation pass failed: {:#}", err);
        }
        Ok(())
    }
}
