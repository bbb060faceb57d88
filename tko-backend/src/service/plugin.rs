//! Plugin Service

use futures::future::join_all;
use std::str::FromStr;
use tracing::{debug, info};

use tko_core::domain::plugin::{PLUGIN_ID_SEPARATOR, Plugin, PluginId, PluginType};
use tko_core::dto::plugin::SelectPlugins;
use tko_core::window::{MAX_MAX_COUNT, Window};
use tko_core::{Gvk, Result, TkoError};

use super::{ValidatingBackend, collect_deletions, validate_id};

impl ValidatingBackend {
    pub(super) async fn set_plugin_checked(&self, plugin: Plugin) -> Result<()> {
        validate_plugin(&plugin)?;

        let plugin_id = plugin.plugin_id.clone();
        self.backend.set_plugin(plugin).await?;
        info!("Plugin set: {}", plugin_id);
        Ok(())
    }

    pub(super) async fn purge_plugins_checked(&self, select: SelectPlugins) -> Result<()> {
        validate_select(&select)?;
        match self.backend.purge_plugins(select.clone()).await {
            Err(err) if err.is_not_implemented() => {}
            result => return result,
        }

        debug!("Purging plugins one by one");
        loop {
            let plugin_ids: Vec<PluginId> = self
                .backend
                .list_plugins(select.clone(), Window::new(0, MAX_MAX_COUNT))
                .await?
                .map(|plugin| plugin.plugin_id)
                .collect();
            if plugin_ids.is_empty() {
                return Ok(());
            }

            let deletions = plugin_ids
                .iter()
                .map(|plugin_id| self.backend.delete_plugin(plugin_id));
            collect_deletions(join_all(deletions).await)?;
            info!("Purged {} plugin(s)", plugin_ids.len());
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

pub(super) fn validate_plugin_id(plugin_id: &PluginId) -> Result<()> {
    PluginType::from_str(&plugin_id.plugin_type)?;
    validate_id("plugin", &plugin_id.name)?;
    if plugin_id.name.contains(PLUGIN_ID_SEPARATOR) {
        return Err(TkoError::bad_argument(format!(
            "plugin name contains {:?}: {}",
            PLUGIN_ID_SEPARATOR, plugin_id.name
        )));
    }
    Ok(())
}

fn validate_trigger(trigger: &Gvk) -> Result<()> {
    if trigger.version.is_empty() {
        return Err(TkoError::bad_argument(format!(
            "plugin trigger has no version: {}",
            trigger
        )));
    }
    if trigger.kind.is_empty() {
        return Err(TkoError::bad_argument(format!(
            "plugin trigger has no kind: {}",
            trigger
        )));
    }
    Ok(())
}

fn validate_plugin(plugin: &Plugin) -> Result<()> {
    validate_plugin_id(&plugin.plugin_id)?;
    if plugin.executor.is_empty() {
        return Err(TkoError::bad_argument(format!(
            "plugin has no executor: {}",
            plugin.plugin_id
        )));
    }
    plugin.triggers.iter().try_for_each(validate_trigger)
}

pub(super) fn validate_select(select: &SelectPlugins) -> Result<()> {
    if let Some(plugin_type) = &select.plugin_type {
        PluginType::from_str(plugin_type)?;
    }
    if let Some(trigger) = &select.trigger {
        validate_trigger(trigger)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement() -> Gvk {
        Gvk::new("topology.nephio.org", "v1alpha1", "Placement")
    }

    #[test]
    fn test_valid_plugin() {
        let plugin = Plugin::new(PluginId::new("prepare", "placement"), "command")
            .with_trigger(placement());
        assert!(validate_plugin(&plugin).is_ok());
    }

    #[test]
    fn test_unknown_type() {
        let plugin = Plugin::new(PluginId::new("deploy", "x"), "command");
        assert!(validate_plugin(&plugin).unwrap_err().is_bad_argument());
    }

    #[test]
    fn test_empty_executor() {
        let plugin = Plugin::new(PluginId::new("instantiate", "x"), "");
        assert!(validate_plugin(&plugin).unwrap_err().is_bad_argument());
    }

    #[test]
    fn test_trigger_default_group_allowed() {
        let plugin = Plugin::new(PluginId::new("instantiate", "x"), "command")
            .with_trigger(Gvk::new("", "v1", "ConfigMap"));
        assert!(validate_plugin(&plugin).is_ok());

        let plugin = Plugin::new(PluginId::new("instantiate", "x"), "command")
            .with_trigger(Gvk::new("", "v1", ""));
        assert!(validate_plugin(&plugin).is_err());
    }
}
