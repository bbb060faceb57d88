//! Service Module
//!
//! [`ValidatingBackend`] wraps any store and is the single place where
//! caller input is checked. Everything it rejects surfaces as `BadArgument`
//! before the store is touched; it never rewrites caller-visible IDs.
//!
//! Each entity's operations live in their own file with a trailing
//! validation section.

mod deployment;
mod plugin;
mod site;
mod template;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use tko_core::domain::deployment::{Deployment, DeploymentInfo};
use tko_core::domain::plugin::{Plugin, PluginId};
use tko_core::domain::site::{Site, SiteInfo};
use tko_core::domain::template::{Template, TemplateInfo};
use tko_core::dto::deployment::{SelectDeployments, StartedModification};
use tko_core::dto::plugin::SelectPlugins;
use tko_core::dto::site::SelectSites;
use tko_core::dto::template::SelectTemplates;
use tko_core::pattern::is_valid_id;
use tko_core::{Package, Result, TkoError, Window};

use crate::backend::Backend;
use crate::results::Results;
use crate::validation::Validation;

/// Backend decorator enforcing argument and content rules
#[derive(Clone)]
pub struct ValidatingBackend {
    backend: Arc<dyn Backend>,
    validation: Arc<dyn Validation>,
}

impl ValidatingBackend {
    /// Wraps a store
    ///
    /// # Arguments
    /// * `backend` - The store to delegate to
    /// * `validation` - Content validation used unless a caller supplies its own
    pub fn new(backend: Arc<dyn Backend>, validation: Arc<dyn Validation>) -> Self {
        Self {
            backend,
            validation,
        }
    }

    /// The wrapped store
    pub fn inner(&self) -> &Arc<dyn Backend> {
        &self.backend
    }
}

#[async_trait]
impl Backend for ValidatingBackend {
    async fn connect(&self) -> Result<()> {
        self.backend.connect().await
    }

    async fn release(&self) -> Result<()> {
        self.backend.release().await?;
        info!("Backend released");
        Ok(())
    }

    async fn set_template(&self, template: Template) -> Result<()> {
        self.set_template_checked(template).await
    }

    async fn get_template(&self, template_id: &str) -> Result<Template> {
        validate_id("template", template_id)?;
        self.backend.get_template(template_id).await
    }

    async fn delete_template(&self, template_id: &str) -> Result<()> {
        validate_id("template", template_id)?;
        self.backend.delete_template(template_id).await
    }

    async fn list_templates(
        &self,
        select: SelectTemplates,
        window: Window,
    ) -> Result<Results<TemplateInfo>> {
        self.backend.list_templates(select, window.validate()?).await
    }

    async fn purge_templates(&self, select: SelectTemplates) -> Result<()> {
        self.purge_templates_checked(select).await
    }

    async fn set_site(&self, site: Site) -> Result<()> {
        self.set_site_checked(site).await
    }

    async fn get_site(&self, site_id: &str) -> Result<Site> {
        validate_id("site", site_id)?;
        self.backend.get_site(site_id).await
    }

    async fn delete_site(&self, site_id: &str) -> Result<()> {
        validate_id("site", site_id)?;
        self.backend.delete_site(site_id).await
    }

    async fn list_sites(&self, select: SelectSites, window: Window) -> Result<Results<SiteInfo>> {
        self.backend.list_sites(select, window.validate()?).await
    }

    async fn purge_sites(&self, select: SelectSites) -> Result<()> {
        self.purge_sites_checked(select).await
    }

    async fn create_deployment(&self, deployment: Deployment) -> Result<DeploymentInfo> {
        self.create_deployment_checked(deployment).await
    }

    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment> {
        validate_id("deployment", deployment_id)?;
        self.backend.get_deployment(deployment_id).await
    }

    async fn delete_deployment(&self, deployment_id: &str) -> Result<()> {
        validate_id("deployment", deployment_id)?;
        self.backend.delete_deployment(deployment_id).await
    }

    async fn list_deployments(
        &self,
        select: SelectDeployments,
        window: Window,
    ) -> Result<Results<DeploymentInfo>> {
        if let Some(parent_id) = &select.parent_deployment_id {
            validate_id("parent deployment", parent_id)?;
        }
        self.backend.list_deployments(select, window.validate()?).await
    }

    async fn purge_deployments(&self, select: SelectDeployments) -> Result<()> {
        self.purge_deployments_checked(select).await
    }

    async fn start_deployment_modification(
        &self,
        deployment_id: &str,
    ) -> Result<StartedModification> {
        validate_id("deployment", deployment_id)?;
        self.backend
            .start_deployment_modification(deployment_id)
            .await
    }

    async fn end_deployment_modification(
        &self,
        modification_token: &str,
        package: Package,
        validation: Option<&dyn Validation>,
    ) -> Result<String> {
        self.end_deployment_modification_checked(modification_token, package, validation)
            .await
    }

    async fn cancel_deployment_modification(&self, modification_token: &str) -> Result<()> {
        validate_token(modification_token)?;
        self.backend
            .cancel_deployment_modification(modification_token)
            .await
    }

    async fn set_plugin(&self, plugin: Plugin) -> Result<()> {
        self.set_plugin_checked(plugin).await
    }

    async fn get_plugin(&self, plugin_id: &PluginId) -> Result<Plugin> {
        plugin::validate_plugin_id(plugin_id)?;
        self.backend.get_plugin(plugin_id).await
    }

    async fn delete_plugin(&self, plugin_id: &PluginId) -> Result<()> {
        plugin::validate_plugin_id(plugin_id)?;
        self.backend.delete_plugin(plugin_id).await
    }

    async fn list_plugins(&self, select: SelectPlugins, window: Window) -> Result<Results<Plugin>> {
        plugin::validate_select(&select)?;
        self.backend.list_plugins(select, window.validate()?).await
    }

    async fn purge_plugins(&self, select: SelectPlugins) -> Result<()> {
        self.purge_plugins_checked(select).await
    }
}

// =============================================================================
// Validation
// =============================================================================

/// IDs must be non-empty and match `^[0-9A-Za-z_.\-/:]+$`
fn validate_id(what: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(TkoError::bad_argument(format!("{} id is empty", what)));
    }
    if !is_valid_id(id) {
        return Err(TkoError::bad_argument(format!(
            "malformed {} id: {:?}",
            what, id
        )));
    }
    Ok(())
}

fn validate_token(modification_token: &str) -> Result<()> {
    if modification_token.is_empty() {
        return Err(TkoError::bad_argument("modification token is empty"));
    }
    Ok(())
}

/// Folds the outcome of a bulk delete; entries already gone are not errors
fn collect_deletions(results: Vec<Result<()>>) -> Result<()> {
    for result in results {
        match result {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("template", "edge/lab:1").is_ok());
        assert!(validate_id("template", "").unwrap_err().is_bad_argument());
        assert!(validate_id("template", "has space").unwrap_err().is_bad_argument());
    }

    #[test]
    fn test_collect_deletions_ignores_not_found() {
        assert!(collect_deletions(vec![Ok(()), Err(TkoError::not_found("x"))]).is_ok());
        let err = collect_deletions(vec![Err(TkoError::not_done("x"))]).unwrap_err();
        assert!(err.is_not_done());
    }
}
