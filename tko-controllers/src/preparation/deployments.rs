use anyhow::{Context, Result, bail};
use tracing::{Instrument, debug, error, info, info_span};

use tko_backend::modify_deployment;
use tko_core::domain::deployment::{DeploymentInfo, deployment_resource_identifier};
use tko_core::dto::deployment::SelectDeployments;
use tko_core::resource::{find, find_mut};
use tko_core::{Package, Resource, ResourceIdentifier, Window};

use super::{Preparation, PreparationContext};

impl Preparation {
    /// One pass over every deployment not yet prepared
    pub async fn prepare_deployments(&self) -> Result<()> {
        let deployments = self
            .backend
            .list_deployments(SelectDeployments::default().prepared(false), Window::unbounded())
            .await
            .context("Failed to list deployments")?;

        for info in deployments {
            let span = info_span!("deployment", deployment_id = %info.deployment_id);
            self.prepare_deployment(info).instrument(span).await;
        }
        Ok(())
    }

    /// Prepares one deployment as far as it currently goes
    pub async fn prepare_deployment(&self, info: DeploymentInfo) {
        if info.prepared {
            return;
        }
        info!(
            "preparing deployment ({})",
            info.template_id.as_deref().unwrap_or("no template")
        );

        let deployment = match self.backend.get_deployment(&info.deployment_id).await {
            Ok(deployment) => deployment,
            Err(err) if err.is_not_found() => {
                info!("deployment disappeared");
                return;
            }
            Err(err) => {
                error!("{}", err);
                return;
            }
        };

        match self
            .prepare_package(&info.deployment_id, &deployment.package)
            .await
        {
            Ok(true) => debug!("deployment modified"),
            Ok(false) => {}
            Err(err) => error!("{:#}", err),
        }
    }

    /// Returns whether anything was committed
    async fn prepare_package(&self, deployment_id: &str, package: &[Resource]) -> Result<bool> {
        if find(package, &deployment_resource_identifier()).is_some_and(Resource::is_prepared) {
            info!("already prepared");
            return Ok(false);
        }

        let mut modified = false;
        for identifier in self.preparable_resources(package).await {
            let committed = modify_deployment(self.backend.as_ref(), deployment_id, |package| {
                self.prepare_resource(deployment_id, package, &identifier)
            })
            .await?;
            modified |= committed;
        }

        let committed = modify_deployment(self.backend.as_ref(), deployment_id, |package| {
            self.complete_preparation(package)
        })
        .await?;
        Ok(modified || committed)
    }

    /// Runs the resource's preparer against the latest package
    async fn prepare_resource(
        &self,
        deployment_id: &str,
        package: Package,
        identifier: &ResourceIdentifier,
    ) -> Result<Option<Package>> {
        // The package may have moved on since the todo list was built.
        let Some(resource) = find(&package, identifier) else {
            return Ok(None);
        };
        let (preparable, preparer) = self.should_prepare(identifier, resource, false).await;
        if !preparable {
            return Ok(None);
        }
        let Some(preparer) = preparer else {
            return Ok(None);
        };

        let context = PreparationContext::new(self, deployment_id, package, identifier.clone());
        preparer
            .prepare(&context)
            .await
            .with_context(|| format!("prepare {}", identifier))
    }

    /// Marks the deployment prepared once every resource is
    async fn complete_preparation(&self, mut package: Package) -> Result<Option<Package>> {
        if !self.is_fully_prepared(&package).await {
            return Ok(None);
        }
        info!("fully prepared");

        self.validation
            .validate_package(&package, true)
            .await
            .context("validation")?;

        let marker = find_mut(&mut package, &deployment_resource_identifier())
            .context("package has no Deployment resource")?;
        if !marker.set_prepared(true) {
            bail!("malformed Deployment resource");
        }
        if self.auto_approve {
            if !marker.set_approved(true) {
                bail!("malformed Deployment resource");
            }
            info!("auto-approved");
        }
        Ok(Some(package))
    }
}
