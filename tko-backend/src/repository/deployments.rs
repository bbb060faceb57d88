//! Deployment Repository
//!
//! Creation, deletion and the modification lock table. Back-references on
//! templates and sites are updated in the same critical section as the
//! deployment itself.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use tko_core::domain;
use tko_core::domain::deployment::{Deployment, DeploymentInfo};
use tko_core::dto::deployment::{SelectDeployments, StartedModification};
use tko_core::pattern::{IdPatterns, MetadataPatterns};
use tko_core::{Package, Result, TkoError};

use super::{ModificationLock, State};

impl State {
    // =========================================================================
    // Create / Get / Delete
    // =========================================================================

    pub(super) fn create_deployment(&mut self, mut deployment: Deployment) -> Result<DeploymentInfo> {
        self.check_references(&deployment)?;
        if let Some(parent_id) = &deployment.info.parent_deployment_id {
            if !self.deployments.contains_key(parent_id) {
                return Err(TkoError::bad_argument(format!(
                    "unknown parent deployment: {}",
                    parent_id
                )));
            }
        }

        if let Some(template_id) = &deployment.info.template_id {
            if let Some(template) = self.templates.get(template_id) {
                deployment.merge_template(template);
            }
        }
        deployment.merge_deployment_resource();
        deployment.update_metadata();

        let deployment_id = Uuid::new_v4().to_string();
        let timestamp = domain::now();
        deployment.info.deployment_id = deployment_id.clone();
        deployment.info.created = timestamp;
        deployment.info.updated = timestamp;

        self.link(&deployment_id, &deployment.info);
        let info = deployment.info.clone();
        self.deployments.insert(deployment_id.clone(), deployment);

        debug!("Deployment created: {}", deployment_id);
        Ok(info)
    }

    pub(super) fn get_deployment(&self, deployment_id: &str) -> Result<Deployment> {
        self.deployments
            .get(deployment_id)
            .cloned()
            .ok_or_else(|| TkoError::not_found(format!("deployment: {}", deployment_id)))
    }

    /// Removes a deployment; children are orphaned, not deleted
    pub(super) fn delete_deployment(&mut self, deployment_id: &str) -> Result<()> {
        let deployment = self
            .deployments
            .remove(deployment_id)
            .ok_or_else(|| TkoError::not_found(format!("deployment: {}", deployment_id)))?;

        self.unlink(deployment_id, &deployment.info);
        self.modifications.remove(deployment_id);

        for child in self.deployments.values_mut() {
            if child.info.parent_deployment_id.as_deref() == Some(deployment_id) {
                child.info.parent_deployment_id = None;
            }
        }

        debug!("Deployment deleted: {}", deployment_id);
        Ok(())
    }

    /// Matching deployments, oldest first
    pub(super) fn list_deployments(&self, select: &SelectDeployments) -> Result<Vec<DeploymentInfo>> {
        let metadata_patterns = MetadataPatterns::new(&select.metadata_patterns)?;
        let template_id_patterns = IdPatterns::new(&select.template_id_patterns)?;
        let template_metadata_patterns = MetadataPatterns::new(&select.template_metadata_patterns)?;
        let site_id_patterns = IdPatterns::new(&select.site_id_patterns)?;
        let site_metadata_patterns = MetadataPatterns::new(&select.site_metadata_patterns)?;

        let mut infos: Vec<DeploymentInfo> = self
            .deployments
            .values()
            .map(|deployment| &deployment.info)
            .filter(|info| {
                select
                    .parent_deployment_id
                    .as_ref()
                    .is_none_or(|parent| info.parent_deployment_id.as_ref() == Some(parent))
            })
            .filter(|info| select.prepared.is_none_or(|prepared| info.prepared == prepared))
            .filter(|info| select.approved.is_none_or(|approved| info.approved == approved))
            .filter(|info| metadata_patterns.matches(&info.metadata))
            .filter(|info| {
                if template_id_patterns.is_empty() && template_metadata_patterns.is_empty() {
                    return true;
                }
                info.template_id
                    .as_ref()
                    .and_then(|template_id| self.templates.get(template_id))
                    .is_some_and(|template| {
                        template_id_patterns.matches(&template.info.template_id)
                            && template_metadata_patterns.matches(&template.info.metadata)
                    })
            })
            .filter(|info| {
                if site_id_patterns.is_empty() && site_metadata_patterns.is_empty() {
                    return true;
                }
                info.site_id
                    .as_ref()
                    .and_then(|site_id| self.sites.get(site_id))
                    .is_some_and(|site| {
                        site_id_patterns.matches(&site.info.site_id)
                            && site_metadata_patterns.matches(&site.info.metadata)
                    })
            })
            .cloned()
            .collect();

        infos.sort_by(|a, b| {
            a.created
                .cmp(&b.created)
                .then_with(|| a.deployment_id.cmp(&b.deployment_id))
        });
        Ok(infos)
    }

    // =========================================================================
    // Modification
    // =========================================================================

    /// Takes the deployment's lock, replacing it only if it has expired
    pub(super) fn start_modification(
        &mut self,
        deployment_id: &str,
        now: Instant,
        window: Duration,
    ) -> Result<StartedModification> {
        let deployment = self.get_deployment(deployment_id)?;

        if let Some(lock) = self.modifications.get(deployment_id) {
            if !lock.is_expired(now) {
                return Err(TkoError::busy(format!(
                    "deployment is being modified: {}",
                    deployment_id
                )));
            }
            warn!("Replacing expired modification on deployment {}", deployment_id);
        }

        let modification_token = Uuid::new_v4().to_string();
        self.modifications.insert(
            deployment_id.to_string(),
            ModificationLock {
                token: modification_token.clone(),
                expires: now + window,
            },
        );

        debug!("Modification started on deployment {}", deployment_id);
        Ok(StartedModification {
            modification_token,
            deployment,
        })
    }

    /// Builds the deployment as it would look once the package is committed
    ///
    /// Metadata is left as it is; only the marker-backed fields are refreshed.
    pub(super) fn modification_candidate(
        &mut self,
        modification_token: &str,
        package: Package,
        now: Instant,
    ) -> Result<Deployment> {
        let deployment_id = self.check_token(modification_token, now)?;
        let mut candidate = self.get_deployment(&deployment_id)?;
        candidate.package = package;
        if !candidate.update_from_package(false) {
            candidate.merge_deployment_resource();
        }
        Ok(candidate)
    }

    /// Stores a validated candidate and releases the lock
    pub(super) fn commit_modification(
        &mut self,
        modification_token: &str,
        mut candidate: Deployment,
        now: Instant,
    ) -> Result<String> {
        let deployment_id = self.check_token(modification_token, now)?;
        if deployment_id != candidate.info.deployment_id {
            return Err(TkoError::bad_argument(format!(
                "modification token does not belong to deployment: {}",
                candidate.info.deployment_id
            )));
        }
        self.check_references(&candidate)?;

        let previous = self
            .deployments
            .get(&deployment_id)
            .map(|deployment| deployment.info.clone())
            .ok_or_else(|| TkoError::not_found(format!("deployment: {}", deployment_id)))?;
        self.unlink(&deployment_id, &previous);
        self.link(&deployment_id, &candidate.info);

        candidate.info.updated = domain::now();
        self.deployments.insert(deployment_id.clone(), candidate);
        self.modifications.remove(&deployment_id);
        Ok(deployment_id)
    }

    /// Releases a lock whether or not it has expired
    pub(super) fn cancel_modification(&mut self, modification_token: &str) -> Result<()> {
        let deployment_id = self
            .deployment_for_token(modification_token)
            .ok_or_else(|| TkoError::not_found("modification token"))?;
        self.modifications.remove(&deployment_id);
        debug!("Modification cancelled on deployment {}", deployment_id);
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn deployment_for_token(&self, modification_token: &str) -> Option<String> {
        self.modifications
            .iter()
            .find(|(_, lock)| lock.token == modification_token)
            .map(|(deployment_id, _)| deployment_id.clone())
    }

    /// Resolves a live token to its deployment; expired tokens are dropped
    fn check_token(&mut self, modification_token: &str, now: Instant) -> Result<String> {
        let deployment_id = self
            .deployment_for_token(modification_token)
            .ok_or_else(|| TkoError::not_found("modification token"))?;

        let expired = self
            .modifications
            .get(&deployment_id)
            .is_some_and(|lock| lock.is_expired(now));
        if expired {
            self.modifications.remove(&deployment_id);
            return Err(TkoError::timeout(format!(
                "modification of deployment {} expired",
                deployment_id
            )));
        }
        Ok(deployment_id)
    }

    fn check_references(&self, deployment: &Deployment) -> Result<()> {
        if let Some(template_id) = &deployment.info.template_id {
            if !self.templates.contains_key(template_id) {
                return Err(TkoError::bad_argument(format!(
                    "unknown template: {}",
                    template_id
                )));
            }
        }
        if let Some(site_id) = &deployment.info.site_id {
            if !self.sites.contains_key(site_id) {
                return Err(TkoError::bad_argument(format!("unknown site: {}", site_id)));
            }
        }
        Ok(())
    }

    fn link(&mut self, deployment_id: &str, info: &DeploymentInfo) {
        if let Some(template) = info
            .template_id
            .as_ref()
            .and_then(|template_id| self.templates.get_mut(template_id))
        {
            template.info.deployment_ids.insert(deployment_id.to_string());
        }
        if let Some(site) = info
            .site_id
            .as_ref()
            .and_then(|site_id| self.sites.get_mut(site_id))
        {
            site.info.deployment_ids.insert(deployment_id.to_string());
        }
    }

    fn unlink(&mut self, deployment_id: &str, info: &DeploymentInfo) {
        if let Some(template) = info
            .template_id
            .as_ref()
            .and_then(|template_id| self.templates.get_mut(template_id))
        {
            template.info.deployment_ids.remove(deployment_id);
        }
        if let Some(site) = info
            .site_id
            .as_ref()
            .and_then(|site_id| self.sites.get_mut(site_id))
        {
            site.info.deployment_ids.remove(deployment_id);
        }
    }
}
