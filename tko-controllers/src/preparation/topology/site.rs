use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use tko_core::domain::site::Site;
use tko_core::resource::find_mut;
use tko_core::{Package, Resource};

use crate::preparation::{PreparationContext, Preparer};

/// Metadata set on sites created by provisioning
pub const PROVISIONED_TYPE: &str = "provisioned";

/// Resolves a Site resource to a site ID, provisioning one if asked to
///
/// The ID lands in `status.siteId`. An explicit `spec.siteId` is taken as is;
/// otherwise, with `spec.provisionIfNotFound`, a new site is created from
/// `spec.provisionTemplateId` plus the resources named in `spec.merge`.
pub struct SitePreparer;

#[async_trait]
impl Preparer for SitePreparer {
    async fn prepare(&self, context: &PreparationContext<'_>) -> Result<Option<Package>> {
        info!("preparing Site: {}", context.target.name);
        let Some(site) = context.target_resource() else {
            return Ok(None);
        };

        let site_id = if let Some(site_id) = site.get_str(&["spec", "siteId"]) {
            site_id.to_string()
        } else if site.get_bool(&["spec", "provisionIfNotFound"]).unwrap_or(false)
            && status_site_id(site).is_none()
        {
            let references = site.get_list(&["spec", "merge"]).cloned().unwrap_or_default();
            let Some(merge) = context.merge_package(&references).await? else {
                return Ok(None);
            };

            let template_id = site
                .get_str(&["spec", "provisionTemplateId"])
                .map(str::to_string);
            let site_id = format!("{}/{}", PROVISIONED_TYPE, Uuid::new_v4());
            context
                .backend()
                .set_site(Site::new(&site_id, template_id, merge).with_metadata("type", PROVISIONED_TYPE))
                .await
                .with_context(|| format!("did not provision new site: {}", site_id))?;
            info!("provisioned new site: {}", site_id);
            site_id
        } else {
            return Ok(None);
        };

        let mut package = context.package.clone();
        let site = find_mut(&mut package, &context.target).context("Site resource disappeared")?;
        if !set_status_site_id(site, &site_id) || !site.set_prepared(true) {
            bail!("malformed Site resource");
        }
        Ok(Some(package))
    }
}

/// Site ID assigned to a Site resource, if any
pub fn status_site_id(site: &Resource) -> Option<&str> {
    site.get_str(&["status", "siteId"])
}

fn set_status_site_id(site: &mut Resource, site_id: &str) -> bool {
    site.set_path(&["status", "siteId"], Value::String(site_id.to_string()))
}
