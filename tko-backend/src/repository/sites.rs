//! Site Repository

use tko_core::domain::now;
use tko_core::domain::site::{Site, SiteInfo};
use tko_core::dto::site::SelectSites;
use tko_core::pattern::{IdPatterns, MetadataPatterns};
use tko_core::{Result, TkoError};
use tracing::debug;

use super::State;

impl State {
    /// Stores a site, rebuilding it on top of its template first
    pub(super) fn set_site(&mut self, mut site: Site) -> Result<()> {
        if let Some(template_id) = &site.info.template_id {
            let template = self.templates.get(template_id).ok_or_else(|| {
                TkoError::bad_argument(format!("unknown template: {}", template_id))
            })?;
            site.merge_template(template);
        }

        site.update_from_package();
        site.info.updated = now();
        site.info.deployment_ids = self
            .sites
            .get(&site.info.site_id)
            .map(|existing| existing.info.deployment_ids.clone())
            .unwrap_or_default();

        debug!("Site set: {}", site.info.site_id);
        self.sites.insert(site.info.site_id.clone(), site);
        Ok(())
    }

    pub(super) fn get_site(&self, site_id: &str) -> Result<Site> {
        self.sites
            .get(site_id)
            .cloned()
            .ok_or_else(|| TkoError::not_found(format!("site: {}", site_id)))
    }

    /// Removes a site; deployments placed there lose their site reference
    pub(super) fn delete_site(&mut self, site_id: &str) -> Result<()> {
        self.sites
            .remove(site_id)
            .ok_or_else(|| TkoError::not_found(format!("site: {}", site_id)))?;

        for deployment in self.deployments.values_mut() {
            if deployment.info.site_id.as_deref() == Some(site_id) {
                deployment.set_site_id(None);
            }
        }

        debug!("Site deleted: {}", site_id);
        Ok(())
    }

    /// Matching sites, sorted by ID
    pub(super) fn list_sites(&self, select: &SelectSites) -> Result<Vec<SiteInfo>> {
        let id_patterns = IdPatterns::new(&select.site_id_patterns)?;
        let template_id_patterns = IdPatterns::new(&select.template_id_patterns)?;
        let metadata_patterns = MetadataPatterns::new(&select.metadata_patterns)?;

        let mut infos: Vec<SiteInfo> = self
            .sites
            .values()
            .filter(|site| id_patterns.matches(&site.info.site_id))
            .filter(|site| {
                template_id_patterns.is_empty()
                    || site
                        .info
                        .template_id
                        .as_deref()
                        .is_some_and(|template_id| template_id_patterns.matches(template_id))
            })
            .filter(|site| metadata_patterns.matches(&site.info.metadata))
            .map(|site| site.info.clone())
            .collect();

        infos.sort_by(|a, b| a.site_id.cmp(&b.site_id));
        Ok(infos)
    }
}
