//! Backend contract
//!
//! Set/Get/Delete/List over templates, sites and plugins; Create/Get/Delete/
//! List plus the token-gated modification protocol over deployments.
//!
//! Every operation may fail with `BadArgument`. Implementations must be safe
//! under concurrent calls, including concurrent modification calls against
//! the same deployment.

use async_trait::async_trait;
use tko_core::domain::deployment::{Deployment, DeploymentInfo};
use tko_core::domain::plugin::{Plugin, PluginId};
use tko_core::domain::site::{Site, SiteInfo};
use tko_core::domain::template::{Template, TemplateInfo};
use tko_core::dto::deployment::{SelectDeployments, StartedModification};
use tko_core::dto::plugin::SelectPlugins;
use tko_core::dto::site::SelectSites;
use tko_core::dto::template::SelectTemplates;
use tko_core::{Package, Result, TkoError, Window};

use crate::results::Results;
use crate::validation::Validation;

/// Storage contract consumed by controllers and exposed by stores
#[async_trait]
pub trait Backend: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn release(&self) -> Result<()>;

    // =========================================================================
    // Templates
    // =========================================================================

    /// Creates or replaces a template; incoming deployment IDs are ignored
    ///
    /// Error can be `NotDone`.
    async fn set_template(&self, template: Template) -> Result<()>;

    /// Error can be `NotFound`.
    async fn get_template(&self, template_id: &str) -> Result<Template>;

    /// Unlinks deployments but does not delete them
    ///
    /// Error can be `NotDone` or `NotFound`.
    async fn delete_template(&self, template_id: &str) -> Result<()>;

    async fn list_templates(
        &self,
        select: SelectTemplates,
        window: Window,
    ) -> Result<Results<TemplateInfo>>;

    /// Error can be `NotImplemented` for stores without bulk deletion.
    async fn purge_templates(&self, _select: SelectTemplates) -> Result<()> {
        Err(TkoError::not_implemented("purge templates"))
    }

    // =========================================================================
    // Sites
    // =========================================================================

    /// Creates or replaces a site, merging its template if it names one
    ///
    /// Error can be `NotDone`.
    async fn set_site(&self, site: Site) -> Result<()>;

    /// Error can be `NotFound`.
    async fn get_site(&self, site_id: &str) -> Result<Site>;

    /// Error can be `NotDone` or `NotFound`.
    async fn delete_site(&self, site_id: &str) -> Result<()>;

    async fn list_sites(&self, select: SelectSites, window: Window) -> Result<Results<SiteInfo>>;

    async fn purge_sites(&self, _select: SelectSites) -> Result<()> {
        Err(TkoError::not_implemented("purge sites"))
    }

    // =========================================================================
    // Deployments
    // =========================================================================

    /// Persists a new deployment under a fresh ID
    ///
    /// Error can be `NotDone`.
    async fn create_deployment(&self, deployment: Deployment) -> Result<DeploymentInfo>;

    /// Error can be `NotFound`.
    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment>;

    /// Orphans child deployments rather than deleting them
    ///
    /// Error can be `NotDone` or `NotFound`.
    async fn delete_deployment(&self, deployment_id: &str) -> Result<()>;

    async fn list_deployments(
        &self,
        select: SelectDeployments,
        window: Window,
    ) -> Result<Results<DeploymentInfo>>;

    async fn purge_deployments(&self, _select: SelectDeployments) -> Result<()> {
        Err(TkoError::not_implemented("purge deployments"))
    }

    /// Grants exclusive edit access to one deployment
    ///
    /// Error can be `NotDone`, `NotFound`, or `Busy`.
    async fn start_deployment_modification(
        &self,
        deployment_id: &str,
    ) -> Result<StartedModification>;

    /// Commits a modification and releases the lock, returning the deployment ID
    ///
    /// Validation is complete when the new package marks the deployment
    /// prepared, partial otherwise. A validation failure leaves the lock
    /// held. Error can be `NotDone`, `NotFound`, or `Timeout`.
    async fn end_deployment_modification(
        &self,
        modification_token: &str,
        package: Package,
        validation: Option<&dyn Validation>,
    ) -> Result<String>;

    /// Error can be `NotDone` or `NotFound`.
    async fn cancel_deployment_modification(&self, modification_token: &str) -> Result<()>;

    // =========================================================================
    // Plugins
    // =========================================================================

    /// Error can be `NotDone`.
    async fn set_plugin(&self, plugin: Plugin) -> Result<()>;

    /// Error can be `NotFound`.
    async fn get_plugin(&self, plugin_id: &PluginId) -> Result<Plugin>;

    /// Error can be `NotDone` or `NotFound`.
    async fn delete_plugin(&self, plugin_id: &PluginId) -> Result<()>;

    async fn list_plugins(&self, select: SelectPlugins, window: Window) -> Result<Results<Plugin>>;

    async fn purge_plugins(&self, _select: SelectPlugins) -> Result<()> {
        Err(TkoError::not_implemented("purge plugins"))
    }
}
