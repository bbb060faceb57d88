use std::sync::Arc;
use tracing::{debug, error};

use tko_core::domain::deployment::deployment_resource_identifier;
use tko_core::resource::annotations::Directive;
use tko_core::{Resource, ResourceIdentifier};

use super::{Preparation, Preparer};

impl Preparation {
    /// Whether a resource still needs preparing, and by whom
    ///
    /// A resource annotated to be prepared here needs preparing even when no
    /// preparer is available, which keeps the deployment from completing.
    /// Without an annotation, a resource is prepared only if a preparer exists.
    pub(crate) async fn should_prepare(
        &self,
        identifier: &ResourceIdentifier,
        resource: &Resource,
        verbose: bool,
    ) -> (bool, Option<Arc<dyn Preparer>>) {
        let annotated = match resource.prepare_directive() {
            Some(Directive::Here) => true,
            Some(_) => return (false, None),
            None => false,
        };

        match self.preparer(&identifier.gvk).await {
            Ok(Some(preparer)) => {
                if !resource.is_prepared() {
                    (true, Some(preparer))
                } else {
                    if verbose {
                        debug!("already prepared: {}", identifier);
                    }
                    (false, None)
                }
            }
            Ok(None) => {
                if annotated && verbose {
                    error!("plugin not registered: {}", identifier);
                }
                (annotated, None)
            }
            Err(err) => {
                if verbose {
                    error!("{}: {:#}", identifier, err);
                }
                (false, None)
            }
        }
    }

    /// Identifiers of the resources that still need preparing, in package order
    pub async fn preparable_resources(&self, package: &[Resource]) -> Vec<ResourceIdentifier> {
        let mut todo = Vec::new();
        for resource in package {
            let Some(identifier) = resource.identifier() else {
                continue;
            };
            if self.should_prepare(&identifier, resource, true).await.0 {
                todo.push(identifier);
            }
        }
        todo
    }

    /// Whether every preparable resource other than the marker is prepared
    pub async fn is_fully_prepared(&self, package: &[Resource]) -> bool {
        let marker = deployment_resource_identifier();
        for resource in package {
            let Some(identifier) = resource.identifier() else {
                continue;
            };
            if identifier == marker {
                continue;
            }
            if self.should_prepare(&identifier, resource, false).await.0 && !resource.is_prepared() {
                return false;
            }
        }
        true
    }
}
