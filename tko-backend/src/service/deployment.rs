//! Deployment Service
//!
//! The prepared flag decides how strictly content is validated: a deployment
//! claiming to be prepared must pass complete validation, anything else only
//! partial validation.

use futures::future::join_all;
use tracing::{debug, info};

use tko_core::domain::deployment::{Deployment, DeploymentInfo};
use tko_core::dto::deployment::SelectDeployments;
use tko_core::window::{MAX_MAX_COUNT, Window};
use tko_core::{Package, Result, TkoError};

use super::{ValidatingBackend, collect_deletions, validate_id, validate_token};
use crate::validation::Validation;

impl ValidatingBackend {
    pub(super) async fn create_deployment_checked(
        &self,
        mut deployment: Deployment,
    ) -> Result<DeploymentInfo> {
        deployment.update_from_package(false);
        validate_references(&deployment)?;
        self.validation
            .validate_package(&deployment.package, deployment.info.prepared)
            .await?;

        let info = self.backend.create_deployment(deployment).await?;
        info!("Deployment created: {}", info.deployment_id);
        Ok(info)
    }

    /// Content is validated here and again by the store against its
    /// candidate; a rejection leaves the modification open
    pub(super) async fn end_deployment_modification_checked(
        &self,
        modification_token: &str,
        package: Package,
        validation: Option<&dyn Validation>,
    ) -> Result<String> {
        validate_token(modification_token)?;
        let prepared = validate_modified_package(&package)?;

        let validation = validation.unwrap_or(self.validation.as_ref());
        validation.validate_package(&package, prepared).await?;
        let deployment_id = self
            .backend
            .end_deployment_modification(modification_token, package, Some(validation))
            .await?;
        info!("Deployment modified: {}", deployment_id);
        Ok(deployment_id)
    }

    pub(super) async fn purge_deployments_checked(&self, select: SelectDeployments) -> Result<()> {
        match self.backend.purge_deployments(select.clone()).await {
            Err(err) if err.is_not_implemented() => {}
            result => return result,
        }

        debug!("Purging deployments one by one");
        loop {
            let deployment_ids: Vec<String> = self
                .backend
                .list_deployments(select.clone(), Window::new(0, MAX_MAX_COUNT))
                .await?
                .map(|info| info.deployment_id)
                .collect();
            if deployment_ids.is_empty() {
                return Ok(());
            }

            let deletions = deployment_ids
                .iter()
                .map(|deployment_id| self.backend.delete_deployment(deployment_id));
            collect_deletions(join_all(deletions).await)?;
            info!("Purged {} deployment(s)", deployment_ids.len());
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_references(deployment: &Deployment) -> Result<()> {
    if let Some(parent_id) = &deployment.info.parent_deployment_id {
        validate_id("parent deployment", parent_id)?;
    }
    if let Some(template_id) = &deployment.info.template_id {
        validate_id("template", template_id)?;
    }
    if let Some(site_id) = &deployment.info.site_id {
        validate_id("site", site_id)?;
    }
    Ok(())
}

/// A modified package must still carry its deployment marker with
/// well-formed references
///
/// Returns the prepared flag the marker claims.
fn validate_modified_package(package: &[tko_core::Resource]) -> Result<bool> {
    let mut deployment = Deployment::new(None, None, None, false, false, package.to_vec());
    if !deployment.update_from_package(false) {
        return Err(TkoError::bad_argument(
            "package has no deployment resource",
        ));
    }
    validate_references(&deployment)?;
    Ok(deployment.info.prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tko_core::resource::decode_package;

    #[test]
    fn test_modified_package_needs_marker() {
        let package =
            decode_package("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n").unwrap();
        assert!(validate_modified_package(&package)
            .unwrap_err()
            .is_bad_argument());
    }

    #[test]
    fn test_modified_package_references_are_checked() {
        let package = decode_package(
            "apiVersion: deployment.nephio.org/v1alpha1\nkind: Deployment\nmetadata:\n  name: deployment\nspec:\n  templateId: \"bad id\"\n",
        )
        .unwrap();
        assert!(validate_modified_package(&package).is_err());

        let package = decode_package(
            "apiVersion: deployment.nephio.org/v1alpha1\nkind: Deployment\nmetadata:\n  name: deployment\nspec:\n  templateId: edge\n",
        )
        .unwrap();
        assert_eq!(validate_modified_package(&package).ok(), Some(false));
    }
}
