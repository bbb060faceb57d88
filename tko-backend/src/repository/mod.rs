//! Repository Module
//!
//! In-memory store behind the backend contract. All state sits behind one
//! async mutex; each entity's operations live in their own file as methods
//! on [`State`].
//!
//! The store validates only what it alone knows: references to other
//! entities, modification tokens and their expiry. Input shape is left to
//! the validating decorator.

mod deployments;
mod plugins;
mod sites;
mod templates;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use tko_core::domain::deployment::{Deployment, DeploymentInfo};
use tko_core::domain::plugin::{Plugin, PluginId};
use tko_core::domain::site::{Site, SiteInfo};
use tko_core::domain::template::{Template, TemplateInfo};
use tko_core::dto::deployment::{SelectDeployments, StartedModification};
use tko_core::dto::plugin::SelectPlugins;
use tko_core::dto::site::SelectSites;
use tko_core::dto::template::SelectTemplates;
use tko_core::{Package, Result, Window};

use crate::backend::Backend;
use crate::results::Results;
use crate::validation::Validation;

/// Default lifetime of a modification token
pub const DEFAULT_MODIFICATION_WINDOW: Duration = Duration::from_secs(5);

/// Backend that keeps everything in process memory
pub struct MemoryBackend {
    state: Mutex<State>,
    modification_window: Duration,
}

/// Exclusive edit held on one deployment
#[derive(Debug, Clone)]
struct ModificationLock {
    token: String,
    expires: Instant,
}

impl ModificationLock {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires
    }
}

#[derive(Default)]
struct State {
    templates: HashMap<String, Template>,
    sites: HashMap<String, Site>,
    deployments: HashMap<String, Deployment>,
    plugins: HashMap<PluginId, Plugin>,
    /// Deployment ID -> in-flight modification
    modifications: HashMap<String, ModificationLock>,
}

impl MemoryBackend {
    /// Creates an empty store
    ///
    /// # Arguments
    /// * `modification_window` - How long a modification token stays valid
    pub fn new(modification_window: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            modification_window,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MODIFICATION_WINDOW)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn connect(&self) -> Result<()> {
        info!("Memory backend connected");
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        info!("Memory backend released");
        Ok(())
    }

    async fn set_template(&self, template: Template) -> Result<()> {
        self.state.lock().await.set_template(template)
    }

    async fn get_template(&self, template_id: &str) -> Result<Template> {
        self.state.lock().await.get_template(template_id)
    }

    async fn delete_template(&self, template_id: &str) -> Result<()> {
        self.state.lock().await.delete_template(template_id)
    }

    async fn list_templates(
        &self,
        select: SelectTemplates,
        window: Window,
    ) -> Result<Results<TemplateInfo>> {
        let infos = self.state.lock().await.list_templates(&select)?;
        Ok(Results::from_vec(window.apply(infos)))
    }

    async fn set_site(&self, site: Site) -> Result<()> {
        self.state.lock().await.set_site(site)
    }

    async fn get_site(&self, site_id: &str) -> Result<Site> {
        self.state.lock().await.get_site(site_id)
    }

    async fn delete_site(&self, site_id: &str) -> Result<()> {
        self.state.lock().await.delete_site(site_id)
    }

    async fn list_sites(&self, select: SelectSites, window: Window) -> Result<Results<SiteInfo>> {
        let infos = self.state.lock().await.list_sites(&select)?;
        Ok(Results::from_vec(window.apply(infos)))
    }

    async fn create_deployment(&self, deployment: Deployment) -> Result<DeploymentInfo> {
        self.state.lock().await.create_deployment(deployment)
    }

    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment> {
        self.state.lock().await.get_deployment(deployment_id)
    }

    async fn delete_deployment(&self, deployment_id: &str) -> Result<()> {
        self.state.lock().await.delete_deployment(deployment_id)
    }

    async fn list_deployments(
        &self,
        select: SelectDeployments,
        window: Window,
    ) -> Result<Results<DeploymentInfo>> {
        let infos = self.state.lock().await.list_deployments(&select)?;
        Ok(Results::from_vec(window.apply(infos)))
    }

    async fn start_deployment_modification(
        &self,
        deployment_id: &str,
    ) -> Result<StartedModification> {
        self.state.lock().await.start_modification(
            deployment_id,
            Instant::now(),
            self.modification_window,
        )
    }

    async fn end_deployment_modification(
        &self,
        modification_token: &str,
        package: Package,
        validation: Option<&dyn Validation>,
    ) -> Result<String> {
        // Validation runs outside the lock; the commit re-checks the token.
        let candidate = self
            .state
            .lock()
            .await
            .modification_candidate(modification_token, package, Instant::now())?;

        if let Some(validation) = validation {
            validation
                .validate_package(&candidate.package, candidate.info.prepared)
                .await?;
        }

        let deployment_id = self.state.lock().await.commit_modification(
            modification_token,
            candidate,
            Instant::now(),
        )?;
        debug!("Modified deployment {}", deployment_id);
        Ok(deployment_id)
    }

    async fn cancel_deployment_modification(&self, modification_token: &str) -> Result<()> {
        self.state
            .lock()
            .await
            .cancel_modification(modification_token)
    }

    async fn set_plugin(&self, plugin: Plugin) -> Result<()> {
        self.state.lock().await.set_plugin(plugin)
    }

    async fn get_plugin(&self, plugin_id: &PluginId) -> Result<Plugin> {
        self.state.lock().await.get_plugin(plugin_id)
    }

    async fn delete_plugin(&self, plugin_id: &PluginId) -> Result<()> {
        self.state.lock().await.delete_plugin(plugin_id)
    }

    async fn list_plugins(&self, select: SelectPlugins, window: Window) -> Result<Results<Plugin>> {
        let plugins = self.state.lock().await.list_plugins(&select)?;
        Ok(Results::from_vec(window.apply(plugins)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tko_core::domain::plugin::PluginType;
    use tko_core::resource::decode_package;
    use tko_core::Gvk;

    fn backend() -> MemoryBackend {
        MemoryBackend::new(Duration::from_secs(5))
    }

    async fn with_template(backend: &MemoryBackend, template_id: &str) {
        backend
            .set_template(Template::new(template_id, Package::new()))
            .await
            .unwrap();
    }

    async fn create(backend: &MemoryBackend, template_id: &str) -> DeploymentInfo {
        backend
            .create_deployment(Deployment::new(
                None,
                Some(template_id.to_string()),
                None,
                false,
                false,
                Package::new(),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_links_template() {
        let backend = backend();
        with_template(&backend, "edge").await;
        let info = create(&backend, "edge").await;

        assert!(!info.deployment_id.is_empty());
        let template = backend.get_template("edge").await.unwrap();
        assert!(template.info.deployment_ids.contains(&info.deployment_id));

        let deployment = backend.get_deployment(&info.deployment_id).await.unwrap();
        let marker = deployment.marker().unwrap();
        assert_eq!(marker.get_str(&["spec", "templateId"]), Some("edge"));
    }

    #[tokio::test]
    async fn test_set_template_keeps_deployment_ids() {
        let backend = backend();
        with_template(&backend, "edge").await;
        let info = create(&backend, "edge").await;

        with_template(&backend, "edge").await;
        let template = backend.get_template("edge").await.unwrap();
        assert!(template.info.deployment_ids.contains(&info.deployment_id));
    }

    #[tokio::test]
    async fn test_create_with_unknown_template_fails() {
        let backend = backend();
        let err = backend
            .create_deployment(Deployment::new(
                None,
                Some("missing".to_string()),
                None,
                false,
                false,
                Package::new(),
            ))
            .await
            .unwrap_err();
        assert!(err.is_bad_argument());
    }

    #[tokio::test]
    async fn test_delete_template_unlinks_deployment() {
        let backend = backend();
        with_template(&backend, "edge").await;
        let info = create(&backend, "edge").await;

        backend.delete_template("edge").await.unwrap();
        let deployment = backend.get_deployment(&info.deployment_id).await.unwrap();
        assert_eq!(deployment.info.template_id, None);
        assert_eq!(deployment.marker().unwrap().get_str(&["spec", "templateId"]), None);
    }

    #[tokio::test]
    async fn test_delete_deployment_orphans_children() {
        let backend = backend();
        with_template(&backend, "edge").await;
        let parent = create(&backend, "edge").await;
        let child = backend
            .create_deployment(Deployment::new(
                Some(parent.deployment_id.clone()),
                None,
                None,
                false,
                false,
                Package::new(),
            ))
            .await
            .unwrap();

        backend.delete_deployment(&parent.deployment_id).await.unwrap();
        let child = backend.get_deployment(&child.deployment_id).await.unwrap();
        assert_eq!(child.info.parent_deployment_id, None);
        assert!(backend.get_template("edge").await.unwrap().info.deployment_ids.is_empty());
    }

    #[tokio::test]
    async fn test_site_merges_template() {
        let backend = backend();
        backend
            .set_template(Template::new(
                "lab",
                decode_package("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: base\n").unwrap(),
            ))
            .await
            .unwrap();
        backend
            .set_site(Site::new("lab/1", Some("lab".to_string()), Package::new()))
            .await
            .unwrap();

        let site = backend.get_site("lab/1").await.unwrap();
        assert_eq!(site.package.len(), 1);

        let listed = backend
            .list_sites(SelectSites::default().with_template_id_pattern("lab"), Window::default())
            .await
            .unwrap()
            .into_vec();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_list_templates_window() {
        let backend = backend();
        for template_id in ["a", "b", "c"] {
            with_template(&backend, template_id).await;
        }

        let listed: Vec<_> = backend
            .list_templates(SelectTemplates::default(), Window::new(1, 1))
            .await
            .unwrap()
            .map(|info| info.template_id)
            .collect();
        assert_eq!(listed, vec!["b"]);
    }

    #[tokio::test]
    async fn test_modification_is_exclusive() {
        let backend = backend();
        with_template(&backend, "edge").await;
        let info = create(&backend, "edge").await;

        let started = backend
            .start_deployment_modification(&info.deployment_id)
            .await
            .unwrap();
        let err = backend
            .start_deployment_modification(&info.deployment_id)
            .await
            .unwrap_err();
        assert!(err.is_busy());

        backend
            .cancel_deployment_modification(&started.modification_token)
            .await
            .unwrap();
        assert!(backend
            .start_deployment_modification(&info.deployment_id)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_starts_grant_one_token() {
        let backend = backend();
        with_template(&backend, "edge").await;
        let info = create(&backend, "edge").await;

        let (first, second) = tokio::join!(
            backend.start_deployment_modification(&info.deployment_id),
            backend.start_deployment_modification(&info.deployment_id),
        );
        let (started, err) = match (first, second) {
            (Ok(started), Err(err)) | (Err(err), Ok(started)) => (started, err),
            (first, second) => panic!("expected one winner: {:?} / {:?}", first.is_ok(), second.is_ok()),
        };
        assert!(err.is_busy());
        assert_eq!(started.deployment.info.deployment_id, info.deployment_id);
    }

    #[tokio::test]
    async fn test_token_is_single_use() {
        let backend = backend();
        with_template(&backend, "edge").await;
        let info = create(&backend, "edge").await;

        let started = backend
            .start_deployment_modification(&info.deployment_id)
            .await
            .unwrap();
        let deployment_id = backend
            .end_deployment_modification(
                &started.modification_token,
                started.deployment.package.clone(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(deployment_id, info.deployment_id);

        let err = backend
            .end_deployment_modification(&started.modification_token, Package::new(), None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let err = backend
            .cancel_deployment_modification(&started.modification_token)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_expired_token_times_out() {
        tokio::time::pause();
        let backend = backend();
        with_template(&backend, "edge").await;
        let info = create(&backend, "edge").await;

        let started = backend
            .start_deployment_modification(&info.deployment_id)
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;

        let err = backend
            .end_deployment_modification(
                &started.modification_token,
                started.deployment.package.clone(),
                None,
            )
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(backend
            .start_deployment_modification(&info.deployment_id)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_expired_lock_can_be_taken_over() {
        tokio::time::pause();
        let backend = backend();
        with_template(&backend, "edge").await;
        let info = create(&backend, "edge").await;

        backend
            .start_deployment_modification(&info.deployment_id)
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(backend
            .start_deployment_modification(&info.deployment_id)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_end_refreshes_fields_from_marker() {
        let backend = backend();
        with_template(&backend, "edge").await;
        backend
            .set_site(Site::new("lab/1", None, Package::new()))
            .await
            .unwrap();
        let info = create(&backend, "edge").await;

        let started = backend
            .start_deployment_modification(&info.deployment_id)
            .await
            .unwrap();
        let mut deployment = started.deployment;
        deployment.set_site_id(Some("lab/1".to_string()));
        backend
            .end_deployment_modification(&started.modification_token, deployment.package, None)
            .await
            .unwrap();

        let deployment = backend.get_deployment(&info.deployment_id).await.unwrap();
        assert_eq!(deployment.info.site_id.as_deref(), Some("lab/1"));
        let site = backend.get_site("lab/1").await.unwrap();
        assert!(site.info.deployment_ids.contains(&info.deployment_id));
    }

    #[tokio::test]
    async fn test_list_plugins_by_trigger() {
        let backend = backend();
        let gvk = Gvk::new("topology.nephio.org", "v1alpha1", "Placement");
        backend
            .set_plugin(
                Plugin::new(PluginId::new(PluginType::Prepare.as_str(), "placement"), "command")
                    .with_trigger(gvk.clone()),
            )
            .await
            .unwrap();
        backend
            .set_plugin(Plugin::new(
                PluginId::new(PluginType::Prepare.as_str(), "other"),
                "command",
            ))
            .await
            .unwrap();

        let listed = backend
            .list_plugins(
                SelectPlugins::of_type(PluginType::Prepare.as_str()).with_trigger(gvk),
                Window::default(),
            )
            .await
            .unwrap()
            .into_vec();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].plugin_id.name, "placement");
    }
}
