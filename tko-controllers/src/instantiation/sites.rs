use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{Instrument, debug, error, info, info_span};

use tko_core::domain::site::SiteInfo;
use tko_core::dto::site::SelectSites;
use tko_core::{Package, Window};

use super::{Instantiation, InstantiationContext};

impl Instantiation {
    /// One pass over every site
    pub async fn instantiate_sites(&self) -> Result<()> {
        let sites = self
            .backend
            .list_sites(SelectSites::default(), Window::unbounded())
            .await
            .context("Failed to list sites")?;

        for site in sites {
            let span = info_span!("site", site_id = %site.site_id);
            self.instantiate_site(site).instrument(span).await;
        }
        Ok(())
    }

    /// Runs instantiators for one site; failures are logged per resource
    pub async fn instantiate_site(&self, info: SiteInfo) {
        debug!("instantiating site");
        let site = match self.backend.get_site(&info.site_id).await {
            Ok(site) => site,
            Err(err) if err.is_not_found() => {
                info!("site disappeared");
                return;
            }
            Err(err) => {
                error!("{}", err);
                return;
            }
        };

        let mut deployments: Option<BTreeMap<String, Package>> = None;
        for resource in &site.package {
            let Some(identifier) = resource.identifier() else {
                continue;
            };

            let instantiator = match self.instantiator(&identifier.gvk).await {
                Ok(Some(instantiator)) => instantiator,
                Ok(None) => continue,
                Err(err) => {
                    error!("{}: {:#}", identifier, err);
                    continue;
                }
            };

            if deployments.is_none() {
                deployments = Some(self.prepared_deployments(&site.info.deployment_ids).await);
            }

            let context = InstantiationContext {
                site_id: site.info.site_id.clone(),
                site_package: site.package.clone(),
                target: identifier,
                deployments: deployments.clone().unwrap_or_default(),
            };
            if let Err(err) = instantiator.instantiate(&context).await {
                error!("{}: {:#}", context.target, err);
            }
        }
    }

    /// Packages of the prepared deployments among `deployment_ids`
    async fn prepared_deployments(&self, deployment_ids: &BTreeSet<String>) -> BTreeMap<String, Package> {
        let mut deployments = BTreeMap::new();
        for deployment_id in deployment_ids {
            match self.backend.get_deployment(deployment_id).await {
                Ok(deployment) if deployment.info.prepared => {
                    deployments.insert(deployment_id.clone(), deployment.package);
                }
                Ok(_) => {}
                Err(err) if err.is_not_found() => {}
                Err(err) => error!("{}", err),
            }
        }
        deployments
    }
}
