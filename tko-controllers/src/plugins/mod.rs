//! Plugin execution
//!
//! Command plugins are local programs: `arguments[0]` is the program and the
//! rest are passed through. The input document is written to stdin as YAML
//! and the output document is read back from stdout. Each invocation also
//! gets a named pipe whose lines end up in our own log.

pub mod log_pipe;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use tko_backend::Backend;
use tko_core::domain::plugin::{COMMAND_EXECUTOR, Plugin, PluginId, PluginType};
use tko_core::dto::plugin::SelectPlugins;
use tko_core::{Gvk, Window};

pub use log_pipe::LogPipe;

/// Address plugins use to call back into the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiAddress {
    pub protocol: String,
    pub address: String,
    pub port: u16,
}

impl Default for ApiAddress {
    fn default() -> Self {
        Self {
            protocol: "tcp".to_string(),
            address: "localhost".to_string(),
            port: 50050,
        }
    }
}

/// Everything a plugin invocation needs besides its input
#[derive(Debug, Clone)]
pub struct PluginSettings {
    pub api: ApiAddress,
    /// Prepended to `PATH` for command plugins
    pub plugin_path: Option<PathBuf>,
    /// Where log pipes are created
    pub log_pipe_dir: PathBuf,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            api: ApiAddress::default(),
            plugin_path: None,
            log_pipe_dir: std::env::temp_dir(),
        }
    }
}

/// Finds the plugin handling a GVK
///
/// A plugin whose name is the GVK's textual form wins; otherwise the first
/// plugin of the type (by ID) that lists the GVK among its triggers.
pub async fn find_plugin(
    backend: &dyn Backend,
    plugin_type: PluginType,
    gvk: &Gvk,
) -> tko_core::Result<Option<Plugin>> {
    match backend
        .get_plugin(&PluginId::new(plugin_type.as_str(), gvk.to_string()))
        .await
    {
        Ok(plugin) => return Ok(Some(plugin)),
        // A GVK string is never a valid plugin name for `ValidatingBackend`,
        // which answers `BadArgument`; only a bare store can match by name.
        Err(err) if err.is_not_found() || err.is_bad_argument() => {}
        Err(err) => return Err(err),
    }

    let mut plugins = backend
        .list_plugins(
            SelectPlugins::of_type(plugin_type.as_str()).with_trigger(gvk.clone()),
            Window::new(0, 1),
        )
        .await?;
    Ok(plugins.next())
}

/// Checks that a plugin can be run as a command
pub fn check_command_plugin(plugin: &Plugin) -> Result<()> {
    if plugin.executor != COMMAND_EXECUTOR {
        anyhow::bail!(
            "unsupported plugin executor: {} ({})",
            plugin.executor,
            plugin.plugin_id
        );
    }
    if plugin.arguments.is_empty() {
        anyhow::bail!(
            "plugin of executor \"command\" must have at least one argument: {}",
            plugin.plugin_id
        );
    }
    Ok(())
}

/// Runs a command plugin with a YAML document on stdin and parses its stdout
///
/// A non-zero exit is a failure carrying whatever the plugin wrote to stderr.
/// Empty output parses as the default output document.
pub async fn execute_command<I, O>(arguments: &[String], settings: &PluginSettings, input: &I) -> Result<O>
where
    I: Serialize,
    O: DeserializeOwned + Default,
{
    let (program, rest) = arguments
        .split_first()
        .context("command plugin has no arguments")?;
    let input = serde_yaml::to_string(input).context("Failed to encode plugin input")?;

    let mut command = Command::new(program);
    command
        .args(rest)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(plugin_path) = &settings.plugin_path {
        command.env("PATH", prepend_path(plugin_path));
    }

    debug!("Executing plugin command: {}", arguments.join(" "));
    let mut child = command
        .spawn()
        .with_context(|| format!("Failed to execute '{}'", program))?;

    let mut stdin = child.stdin.take().context("plugin stdin unavailable")?;
    let writer = tokio::spawn(async move {
        stdin.write_all(input.as_bytes()).await?;
        stdin.shutdown().await
    });

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("Failed to wait for '{}'", program))?;
    // The plugin may exit without reading its input.
    let _ = writer.await;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim_matches(['\r', '\n']);
        if stderr.is_empty() {
            anyhow::bail!("plugin '{}' failed: {}", program, output.status);
        }
        anyhow::bail!("plugin '{}' failed: {}\n{}", program, output.status, stderr);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        return Ok(O::default());
    }
    serde_yaml::from_str(&stdout).with_context(|| format!("Malformed output from '{}'", program))
}

fn prepend_path(plugin_path: &Path) -> OsString {
    let mut path = plugin_path.as_os_str().to_os_string();
    if let Some(existing) = std::env::var_os("PATH") {
        path.push(":");
        path.push(existing);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[derive(Debug, Default, Deserialize)]
    struct Output {
        #[serde(default)]
        error: String,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Input {
        site_id: String,
    }

    fn script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn sh(script: String) -> Vec<String> {
        vec!["/bin/sh".to_string(), script]
    }

    fn input() -> Input {
        Input {
            site_id: "lab/1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_find_plugin_by_name_then_trigger() {
        use std::sync::Arc;
        use tko_backend::{MemoryBackend, RegistryValidation, ValidatingBackend};

        let gvk = Gvk::new("example.org", "v1", "Widget");
        let store = Arc::new(MemoryBackend::default());
        store
            .set_plugin(Plugin::new(
                PluginId::new(PluginType::Prepare.as_str(), gvk.to_string()),
                COMMAND_EXECUTOR,
            ))
            .await
            .unwrap();
        store
            .set_plugin(
                Plugin::new(PluginId::new(PluginType::Prepare.as_str(), "widget"), COMMAND_EXECUTOR)
                    .with_trigger(gvk.clone()),
            )
            .await
            .unwrap();

        let by_name = find_plugin(store.as_ref(), PluginType::Prepare, &gvk)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.plugin_id.name, gvk.to_string());

        let validating = ValidatingBackend::new(store, Arc::new(RegistryValidation::new()));
        let by_trigger = find_plugin(&validating, PluginType::Prepare, &gvk)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_trigger.plugin_id.name, "widget");

        assert!(find_plugin(&validating, PluginType::Instantiate, &gvk)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_reads_stdin_and_parses_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(
            dir.path(),
            "echo-site",
            r#"site=$(grep siteId | sed 's/siteId: //'); echo "error: got $site""#,
        );

        let output: Output = execute_command(&sh(program), &PluginSettings::default(), &input())
            .await
            .unwrap();
        assert_eq!(output.error, "got lab/1");
    }

    #[tokio::test]
    async fn test_empty_output_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "quiet", "cat > /dev/null");

        let output: Output = execute_command(&sh(program), &PluginSettings::default(), &input())
            .await
            .unwrap();
        assert!(output.error.is_empty());
    }

    #[tokio::test]
    async fn test_failure_includes_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "broken", "echo 'no such site' >&2; exit 3");

        let err = execute_command::<_, Output>(&sh(program), &PluginSettings::default(), &input())
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("no such site"));
    }

    #[tokio::test]
    async fn test_plugin_path_is_searched() {
        #[derive(Debug, Default, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Echo {
            site_id: String,
        }

        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("/bin/cat", dir.path().join("tko-test-plugin")).unwrap();
        let settings = PluginSettings {
            plugin_path: Some(dir.path().to_path_buf()),
            ..PluginSettings::default()
        };

        let output: Echo = execute_command(&["tko-test-plugin".to_string()], &settings, &input())
            .await
            .unwrap();
        assert_eq!(output.site_id, "lab/1");
    }

    #[test]
    fn test_check_command_plugin() {
        let plugin = Plugin::new(PluginId::new("instantiate", "x"), "command");
        assert!(check_command_plugin(&plugin).is_err());
        assert!(check_command_plugin(&plugin.clone().with_arguments(["run"])).is_ok());

        let plugin = Plugin::new(PluginId::new("instantiate", "x"), "kpt").with_arguments(["run"]);
        assert!(check_command_plugin(&plugin).is_err());
    }
}
