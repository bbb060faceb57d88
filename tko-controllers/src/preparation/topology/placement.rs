use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use tko_core::domain::deployment::Deployment;
use tko_core::dto::site::SelectSites;
use tko_core::resource::metadata::value_to_string;
use tko_core::resource::find_mut;
use tko_core::{Package, Window};

use super::site::status_site_id;
use super::{site_gvk, template_id};
use crate::preparation::{PreparationContext, Preparer};

/// One child deployment to create
struct Placement {
    template_id: String,
    site_id: String,
    package: Package,
}

/// Creates a child deployment per template and site listed in
/// `spec.templates`
///
/// Sites are either names of Site resources in the same package, which must
/// have been assigned a site ID, or `select.metadata` patterns matched against
/// the stored sites. Nothing is created until every named site is assigned.
pub struct PlacementPreparer;

#[async_trait]
impl Preparer for PlacementPreparer {
    async fn prepare(&self, context: &PreparationContext<'_>) -> Result<Option<Package>> {
        info!("preparing Placement: {}", context.target.name);
        let Some(resource) = context.target_resource() else {
            return Ok(None);
        };

        let mut placements = Vec::new();
        let mut all_sites_assigned = true;
        for entry in resource.get_list(&["spec", "templates"]).into_iter().flatten() {
            let Some(template_name) = entry.get("template").and_then(Value::as_str) else {
                continue;
            };
            let template_id = template_id(&context.package, template_name)
                .with_context(|| format!("template not found: {}", template_name))?
                .to_string();

            let references = entry
                .get("merge")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let Some(merge) = context.merge_package(&references).await? else {
                return Ok(None);
            };

            for site in entry.get("sites").and_then(Value::as_array).into_iter().flatten() {
                if let Some(site_name) = site.as_str() {
                    let site_resource =
                        tko_core::resource::find(&context.package, &site_gvk().identifier(site_name))
                            .with_context(|| format!("site not found: {}", site_name))?;
                    match status_site_id(site_resource) {
                        Some(site_id) => placements.push(Placement {
                            template_id: template_id.clone(),
                            site_id: site_id.to_string(),
                            package: merge.clone(),
                        }),
                        None => {
                            debug!("site not yet assigned: {}", site_name);
                            all_sites_assigned = false;
                        }
                    }
                } else if let Some(metadata) =
                    site.pointer("/select/metadata").and_then(Value::as_object)
                {
                    let select = metadata.iter().fold(SelectSites::default(), |select, (key, value)| {
                        select.with_metadata_pattern(key, value_to_string(value))
                    });
                    let sites = context.backend().list_sites(select, Window::unbounded()).await?;
                    for info in sites {
                        placements.push(Placement {
                            template_id: template_id.clone(),
                            site_id: info.site_id,
                            package: merge.clone(),
                        });
                    }
                }
            }
        }

        if !all_sites_assigned {
            return Ok(None);
        }

        for placement in placements {
            let info = context
                .backend()
                .create_deployment(Deployment::new(
                    Some(context.deployment_id.clone()),
                    Some(placement.template_id),
                    Some(placement.site_id),
                    false,
                    false,
                    placement.package,
                ))
                .await
                .context("did not create deployment")?;
            info!(
                "created deployment {} from {} for site {}",
                info.deployment_id,
                info.template_id.as_deref().unwrap_or_default(),
                info.site_id.as_deref().unwrap_or_default()
            );
        }

        let mut package = context.package.clone();
        let placement = find_mut(&mut package, &context.target).context("Placement resource disappeared")?;
        if !placement.set_prepared(true) {
            bail!("malformed Placement resource");
        }
        Ok(Some(package))
    }
}
