//! Template Repository

use tko_core::domain::now;
use tko_core::domain::template::{Template, TemplateInfo};
use tko_core::dto::template::SelectTemplates;
use tko_core::pattern::{IdPatterns, MetadataPatterns};
use tko_core::{Result, TkoError};
use tracing::debug;

use super::State;

impl State {
    pub(super) fn set_template(&mut self, mut template: Template) -> Result<()> {
        template.update_from_package();
        template.info.updated = now();
        template.info.deployment_ids = self
            .templates
            .get(&template.info.template_id)
            .map(|existing| existing.info.deployment_ids.clone())
            .unwrap_or_default();

        debug!("Template set: {}", template.info.template_id);
        self.templates
            .insert(template.info.template_id.clone(), template);
        Ok(())
    }

    pub(super) fn get_template(&self, template_id: &str) -> Result<Template> {
        self.templates
            .get(template_id)
            .cloned()
            .ok_or_else(|| TkoError::not_found(format!("template: {}", template_id)))
    }

    /// Removes a template and unlinks whatever referenced it
    pub(super) fn delete_template(&mut self, template_id: &str) -> Result<()> {
        self.templates
            .remove(template_id)
            .ok_or_else(|| TkoError::not_found(format!("template: {}", template_id)))?;

        for site in self.sites.values_mut() {
            if site.info.template_id.as_deref() == Some(template_id) {
                site.info.template_id = None;
            }
        }

        for deployment in self.deployments.values_mut() {
            if deployment.info.template_id.as_deref() == Some(template_id) {
                deployment.set_template_id(None);
            }
        }

        debug!("Template deleted: {}", template_id);
        Ok(())
    }

    /// Matching templates, sorted by ID
    pub(super) fn list_templates(&self, select: &SelectTemplates) -> Result<Vec<TemplateInfo>> {
        let id_patterns = IdPatterns::new(&select.template_id_patterns)?;
        let metadata_patterns = MetadataPatterns::new(&select.metadata_patterns)?;

        let mut infos: Vec<TemplateInfo> = self
            .templates
            .values()
            .filter(|template| id_patterns.matches(&template.info.template_id))
            .filter(|template| metadata_patterns.matches(&template.info.metadata))
            .map(|template| template.info.clone())
            .collect();

        infos.sort_by(|a, b| a.template_id.cmp(&b.template_id));
        Ok(infos)
    }
}
