//! Plugin Repository

use tko_core::domain::plugin::{Plugin, PluginId};
use tko_core::dto::plugin::SelectPlugins;
use tko_core::pattern::IdPatterns;
use tko_core::{Result, TkoError};
use tracing::debug;

use super::State;

impl State {
    pub(super) fn set_plugin(&mut self, plugin: Plugin) -> Result<()> {
        debug!("Plugin set: {}", plugin.plugin_id);
        self.plugins.insert(plugin.plugin_id.clone(), plugin);
        Ok(())
    }

    pub(super) fn get_plugin(&self, plugin_id: &PluginId) -> Result<Plugin> {
        self.plugins
            .get(plugin_id)
            .cloned()
            .ok_or_else(|| TkoError::not_found(format!("plugin: {}", plugin_id)))
    }

    pub(super) fn delete_plugin(&mut self, plugin_id: &PluginId) -> Result<()> {
        self.plugins
            .remove(plugin_id)
            .ok_or_else(|| TkoError::not_found(format!("plugin: {}", plugin_id)))?;
        debug!("Plugin deleted: {}", plugin_id);
        Ok(())
    }

    /// Matching plugins, sorted by ID
    pub(super) fn list_plugins(&self, select: &SelectPlugins) -> Result<Vec<Plugin>> {
        let name_patterns = IdPatterns::new(&select.name_patterns)?;

        let mut plugins: Vec<Plugin> = self
            .plugins
            .values()
            .filter(|plugin| {
                select
                    .plugin_type
                    .as_ref()
                    .is_none_or(|plugin_type| &plugin.plugin_id.plugin_type == plugin_type)
            })
            .filter(|plugin| name_patterns.matches(&plugin.plugin_id.name))
            .filter(|plugin| {
                select
                    .executor
                    .as_ref()
                    .is_none_or(|executor| &plugin.executor == executor)
            })
            .filter(|plugin| {
                select
                    .trigger
                    .as_ref()
                    .is_none_or(|trigger| plugin.has_trigger(trigger))
            })
            .cloned()
            .collect();

        plugins.sort_by(|a, b| a.plugin_id.cmp(&b.plugin_id));
        Ok(plugins)
    }
}
