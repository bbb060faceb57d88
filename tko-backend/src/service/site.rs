//! Site Service

use futures::future::join_all;
use tracing::{debug, info};

use tko_core::Result;
use tko_core::domain::site::Site;
use tko_core::dto::site::SelectSites;
use tko_core::window::{MAX_MAX_COUNT, Window};

use super::{ValidatingBackend, collect_deletions, validate_id};

impl ValidatingBackend {
    /// A site's own package must be complete
    pub(super) async fn set_site_checked(&self, site: Site) -> Result<()> {
        validate_id("site", &site.info.site_id)?;
        if let Some(template_id) = &site.info.template_id {
            validate_id("template", template_id)?;
        }
        self.validation.validate_package(&site.package, true).await?;

        let site_id = site.info.site_id.clone();
        self.backend.set_site(site).await?;
        info!("Site set: {}", site_id);
        Ok(())
    }

    pub(super) async fn purge_sites_checked(&self, select: SelectSites) -> Result<()> {
        match self.backend.purge_sites(select.clone()).await {
            Err(err) if err.is_not_implemented() => {}
            result => return result,
        }

        debug!("Purging sites one by one");
        loop {
            let site_ids: Vec<String> = self
                .backend
                .list_sites(select.clone(), Window::new(0, MAX_MAX_COUNT))
                .await?
                .map(|info| info.site_id)
                .collect();
            if site_ids.is_empty() {
                return Ok(());
            }

            let deletions = site_ids
                .iter()
                .map(|site_id| self.backend.delete_site(site_id));
            collect_deletions(join_all(deletions).await)?;
            info!("Purged {} site(s)", site_ids.len());
        }
    }
}
