//! Start/transform/end wrapper around the modification protocol
//!
//! Whatever happens inside the transform, the modification is either
//! committed or cancelled before [`modify_deployment`] returns.

use std::future::Future;
use tracing::warn;

use tko_core::{Package, TkoError};

use crate::backend::Backend;

/// Runs `transform` on a deployment's package under its modification lock
///
/// The transform returns `Some(package)` to commit or `None` to leave the
/// deployment alone. Returns whether anything was committed.
///
/// # Arguments
/// * `backend` - Store holding the deployment
/// * `deployment_id` - Deployment to modify
/// * `transform` - Produces the new package from the current one
pub async fn modify_deployment<F, Fut, E>(
    backend: &dyn Backend,
    deployment_id: &str,
    transform: F,
) -> Result<bool, E>
where
    F: FnOnce(Package) -> Fut,
    Fut: Future<Output = Result<Option<Package>, E>>,
    E: From<TkoError>,
{
    let started = backend.start_deployment_modification(deployment_id).await?;
    let token = started.modification_token;

    match transform(started.deployment.package).await {
        Ok(Some(package)) => {
            if let Err(err) = backend
                .end_deployment_modification(&token, package, None)
                .await
            {
                cancel(backend, &token).await;
                return Err(err.into());
            }
            Ok(true)
        }
        Ok(None) => {
            cancel(backend, &token).await;
            Ok(false)
        }
        Err(err) => {
            cancel(backend, &token).await;
            Err(err)
        }
    }
}

async fn cancel(backend: &dyn Backend, token: &str) {
    if let Err(err) = backend.cancel_deployment_modification(token).await {
        // The lock may already be gone, e.g. after a timeout.
        if !err.is_not_found() {
            warn!("Failed to cancel modification: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryBackend;
    use tko_core::domain::deployment::Deployment;
    use tko_core::domain::template::Template;
    use tko_core::resource::decode_package;

    async fn setup() -> (MemoryBackend, String) {
        let backend = MemoryBackend::default();
        backend
            .set_template(Template::new("edge", Package::new()))
            .await
            .unwrap();
        let info = backend
            .create_deployment(Deployment::new(
                None,
                Some("edge".to_string()),
                None,
                false,
                false,
                Package::new(),
            ))
            .await
            .unwrap();
        (backend, info.deployment_id)
    }

    fn config_map(name: &str) -> Package {
        decode_package(&format!("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {}\n", name))
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit() {
        let (backend, deployment_id) = setup().await;
        let modified = modify_deployment(&backend, &deployment_id, |mut package| async move {
            package.extend(config_map("a"));
            Ok::<_, TkoError>(Some(package))
        })
        .await
        .unwrap();

        assert!(modified);
        let deployment = backend.get_deployment(&deployment_id).await.unwrap();
        assert_eq!(deployment.package.len(), 2);
        assert!(backend.start_deployment_modification(&deployment_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_decline_releases_lock() {
        let (backend, deployment_id) = setup().await;
        let modified = modify_deployment(&backend, &deployment_id, |_| async {
            Ok::<_, TkoError>(None)
        })
        .await
        .unwrap();

        assert!(!modified);
        assert!(backend.start_deployment_modification(&deployment_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_transform_error_releases_lock() {
        let (backend, deployment_id) = setup().await;
        let err = modify_deployment(&backend, &deployment_id, |_| async {
            Err::<Option<Package>, _>(TkoError::bad_argument("broken"))
        })
        .await
        .unwrap_err();

        assert!(err.is_bad_argument());
        assert!(backend.start_deployment_modification(&deployment_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_busy_deployment() {
        let (backend, deployment_id) = setup().await;
        backend.start_deployment_modification(&deployment_id).await.unwrap();

        let err = modify_deployment(&backend, &deployment_id, |package| async move {
            Ok::<_, TkoError>(Some(package))
        })
        .await
        .unwrap_err();
        assert!(err.is_busy());
    }
}
