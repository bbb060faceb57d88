//! Command plugin preparers

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use tko_core::domain::plugin::Plugin;
use tko_core::{Package, ResourceIdentifier};

use super::{PreparationContext, Preparer};
use crate::plugins::{ApiAddress, LogPipe, PluginSettings, check_command_plugin, execute_command};

const LOG_PIPE_PREFIX: &str = "tko-preparation";

/// Document written to a prepare plugin's stdin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareInput {
    pub grpc: ApiAddress,
    pub log_file: String,
    pub deployment_id: String,
    pub deployment_resources: Package,
    pub target_resource_identifier: ResourceIdentifier,
}

/// Document read from a prepare plugin's stdout
///
/// `resources` replaces the deployment's package when `prepared` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrepareOutput {
    #[serde(default)]
    pub prepared: bool,
    #[serde(default)]
    pub resources: Package,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Preparer backed by a `command` plugin
pub struct CommandPreparer {
    plugin: Plugin,
    settings: PluginSettings,
}

impl CommandPreparer {
    pub fn new(plugin: Plugin, settings: PluginSettings) -> Result<Self> {
        check_command_plugin(&plugin)?;
        Ok(Self { plugin, settings })
    }
}

#[async_trait]
impl Preparer for CommandPreparer {
    async fn prepare(&self, context: &PreparationContext<'_>) -> Result<Option<Package>> {
        info!(
            "prepare via command plugin for {}: {}",
            context.target,
            self.plugin.arguments.join(" ")
        );

        let log_pipe = LogPipe::start(&self.settings.log_pipe_dir, LOG_PIPE_PREFIX).await?;
        let input = PrepareInput {
            grpc: self.settings.api.clone(),
            log_file: log_pipe.path().display().to_string(),
            deployment_id: context.deployment_id.clone(),
            deployment_resources: context.package.clone(),
            target_resource_identifier: context.target.clone(),
        };

        let output: PrepareOutput =
            execute_command(&self.plugin.arguments, &self.settings, &input).await?;
        if !output.error.is_empty() {
            bail!(output.error);
        }
        Ok(output.prepared.then_some(output.resources))
    }
}
