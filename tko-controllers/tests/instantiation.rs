//! Instantiation passes against the in-memory backend

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use tko_backend::{Backend, MemoryBackend};
use tko_controllers::instantiation::{Instantiation, InstantiationContext, Instantiator};
use tko_controllers::plugins::PluginSettings;
use tko_core::domain::deployment::Deployment;
use tko_core::domain::plugin::{Plugin, PluginId, PluginType};
use tko_core::domain::site::Site;
use tko_core::resource::decode_package;
use tko_core::{Gvk, Package};

#[derive(Default)]
struct Recorder {
    contexts: Mutex<Vec<InstantiationContext>>,
}

impl Recorder {
    fn contexts(&self) -> Vec<InstantiationContext> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Instantiator for Recorder {
    async fn instantiate(&self, context: &InstantiationContext) -> Result<()> {
        self.contexts.lock().unwrap().push(context.clone());
        Ok(())
    }
}

fn cluster_gvk() -> Gvk {
    Gvk::new("example.org", "v1", "Cluster")
}

const SITE_PACKAGE: &str = r#"
apiVersion: example.org/v1
kind: Cluster
metadata:
  name: edge-cluster
spec:
  nodes: 3
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: unrelated
"#;

async fn deploy(backend: &MemoryBackend, site_id: &str, prepared: bool) -> String {
    backend
        .create_deployment(Deployment::new(
            None,
            None,
            Some(site_id.to_string()),
            prepared,
            false,
            Package::new(),
        ))
        .await
        .unwrap()
        .deployment_id
}

#[tokio::test]
async fn test_instantiator_sees_prepared_deployments() {
    let backend = Arc::new(MemoryBackend::default());
    backend
        .set_site(Site::new("lab/1", None, decode_package(SITE_PACKAGE).unwrap()))
        .await
        .unwrap();
    let prepared_id = deploy(&backend, "lab/1", true).await;
    deploy(&backend, "lab/1", false).await;

    let recorder = Arc::new(Recorder::default());
    let mut instantiation = Instantiation::new(backend.clone(), PluginSettings::default());
    instantiation.register_instantiator(cluster_gvk(), recorder.clone());
    instantiation.instantiate_sites().await.unwrap();

    let contexts = recorder.contexts();
    assert_eq!(contexts.len(), 1);
    let context = &contexts[0];
    assert_eq!(context.site_id, "lab/1");
    assert_eq!(context.target, cluster_gvk().identifier("edge-cluster"));
    assert_eq!(
        context.target_resource().and_then(|cluster| cluster.get_path(&["spec", "nodes"])),
        Some(&serde_json::json!(3))
    );
    assert_eq!(context.deployments.keys().collect::<Vec<_>>(), vec![&prepared_id]);
}

#[tokio::test]
async fn test_every_site_is_visited() {
    let backend = Arc::new(MemoryBackend::default());
    for site_id in ["lab/1", "lab/2"] {
        backend
            .set_site(Site::new(site_id, None, decode_package(SITE_PACKAGE).unwrap()))
            .await
            .unwrap();
    }
    backend
        .set_site(Site::new("empty", None, Package::new()))
        .await
        .unwrap();

    let recorder = Arc::new(Recorder::default());
    let mut instantiation = Instantiation::new(backend.clone(), PluginSettings::default());
    instantiation.register_instantiator(cluster_gvk(), recorder.clone());
    instantiation.instantiate_sites().await.unwrap();

    let site_ids: Vec<String> = recorder
        .contexts()
        .into_iter()
        .map(|context| context.site_id)
        .collect();
    assert_eq!(site_ids, vec!["lab/1", "lab/2"]);
    assert!(recorder.contexts().iter().all(|context| context.deployments.is_empty()));
}

#[tokio::test]
async fn test_command_instantiator_receives_site() {
    let backend = Arc::new(MemoryBackend::default());
    backend
        .set_site(Site::new("lab/1", None, decode_package(SITE_PACKAGE).unwrap()))
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let received = dir.path().join("received.yaml");
    let script = dir.path().join("instantiate.sh");
    std::fs::write(&script, format!("cat > {}\n", received.display())).unwrap();
    backend
        .set_plugin(
            Plugin::new(PluginId::new(PluginType::Instantiate.as_str(), "cluster"), "command")
                .with_arguments(["/bin/sh".to_string(), script.to_string_lossy().into_owned()])
                .with_trigger(cluster_gvk()),
        )
        .await
        .unwrap();

    let settings = PluginSettings {
        log_pipe_dir: dir.path().to_path_buf(),
        ..PluginSettings::default()
    };
    let instantiation = Instantiation::new(backend.clone(), settings);
    instantiation.instantiate_sites().await.unwrap();

    let input: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(&received).unwrap()).unwrap();
    assert_eq!(input["siteId"].as_str(), Some("lab/1"));
    assert_eq!(input["targetResourceIdentifier"]["kind"].as_str(), Some("Cluster"));
    assert_eq!(input["siteResources"].as_sequence().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_unhandled_resources_are_skipped() {
    let backend = Arc::new(MemoryBackend::default());
    backend
        .set_site(Site::new("lab/1", None, decode_package(SITE_PACKAGE).unwrap()))
        .await
        .unwrap();

    let instantiation = Instantiation::new(backend.clone(), PluginSettings::default());
    assert!(instantiation.instantiator(&cluster_gvk()).await.unwrap().is_none());
    instantiation.instantiate_sites().await.unwrap();
}
