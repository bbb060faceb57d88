//! Template Service

use futures::future::join_all;
use tracing::{debug, info};

use tko_core::Result;
use tko_core::domain::template::Template;
use tko_core::dto::template::SelectTemplates;
use tko_core::window::{MAX_MAX_COUNT, Window};

use super::{ValidatingBackend, collect_deletions, validate_id};

impl ValidatingBackend {
    /// Templates are never complete on their own, so validation is partial
    pub(super) async fn set_template_checked(&self, template: Template) -> Result<()> {
        validate_id("template", &template.info.template_id)?;
        self.validation
            .validate_package(&template.package, false)
            .await?;

        let template_id = template.info.template_id.clone();
        self.backend.set_template(template).await?;
        info!("Template set: {}", template_id);
        Ok(())
    }

    /// Purges through the store, or deletes matches one by one when the
    /// store has no bulk delete
    pub(super) async fn purge_templates_checked(&self, select: SelectTemplates) -> Result<()> {
        match self.backend.purge_templates(select.clone()).await {
            Err(err) if err.is_not_implemented() => {}
            result => return result,
        }

        debug!("Purging templates one by one");
        loop {
            let template_ids: Vec<String> = self
                .backend
                .list_templates(select.clone(), Window::new(0, MAX_MAX_COUNT))
                .await?
                .map(|info| info.template_id)
                .collect();
            if template_ids.is_empty() {
                return Ok(());
            }

            let deletions = template_ids
                .iter()
                .map(|template_id| self.backend.delete_template(template_id));
            collect_deletions(join_all(deletions).await)?;
            info!("Purged {} template(s)", template_ids.len());
        }
    }
}
