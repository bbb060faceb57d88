//! Command plugin instantiators

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use tko_core::domain::plugin::Plugin;
use tko_core::{Package, ResourceIdentifier};

use super::{InstantiationContext, Instantiator};
use crate::plugins::{ApiAddress, LogPipe, PluginSettings, check_command_plugin, execute_command};

const LOG_PIPE_PREFIX: &str = "tko-instantiation";

/// Document written to an instantiate plugin's stdin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantiateInput {
    pub grpc: ApiAddress,
    pub log_file: String,
    pub site_id: String,
    pub site_resources: Package,
    pub target_resource_identifier: ResourceIdentifier,
    pub deployments: BTreeMap<String, Package>,
}

/// Document read from an instantiate plugin's stdout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstantiateOutput {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Instantiator backed by a `command` plugin
pub struct CommandInstantiator {
    plugin: Plugin,
    settings: PluginSettings,
}

impl CommandInstantiator {
    pub fn new(plugin: Plugin, settings: PluginSettings) -> Result<Self> {
        check_command_plugin(&plugin)?;
        Ok(Self { plugin, settings })
    }
}

#[async_trait]
impl Instantiator for CommandInstantiator {
    async fn instantiate(&self, context: &InstantiationContext) -> Result<()> {
        info!(
            "instantiate via command plugin for {}: {}",
            context.target,
            self.plugin.arguments.join(" ")
        );

        let log_pipe = LogPipe::start(&self.settings.log_pipe_dir, LOG_PIPE_PREFIX).await?;
        let input = InstantiateInput {
            grpc: self.settings.api.clone(),
            log_file: log_pipe.path().display().to_string(),
            site_id: context.site_id.clone(),
            site_resources: context.site_package.clone(),
            target_resource_identifier: context.target.clone(),
            deployments: context.deployments.clone(),
        };

        let output: InstantiateOutput =
            execute_command(&self.plugin.arguments, &self.settings, &input).await?;
        if !output.error.is_empty() {
            anyhow::bail!(output.error);
        }
        Ok(())
    }
}
