//! Periodic reconciliation loop
//!
//! A [`Controller`] owns one background task that waits for either the
//! interval to elapse or a stop request. Ticks never overlap: the next wait
//! only starts once the previous run has returned.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// One reconciliation pass
///
/// An error returned from [`Reconciler::run`] is fatal and stops the
/// controller; recoverable failures should be logged and swallowed.
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    async fn run(&self) -> Result<()>;
}

/// Handle to a running controller
pub struct Controller {
    name: String,
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Controller {
    /// Spawns the loop on the current runtime
    ///
    /// # Arguments
    /// * `name` - Used in log lines
    /// * `reconciler` - Called once per tick
    /// * `interval` - Wait between the end of one run and the start of the next
    pub fn start(name: impl Into<String>, reconciler: Arc<dyn Reconciler>, interval: Duration) -> Self {
        let name = name.into();
        let (stop, mut stopped) = oneshot::channel();

        info!("Starting {} controller (interval: {:?})", name, interval);
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        if let Err(err) = reconciler.run().await {
                            error!("stopped controller due to error: {} ({:#})", task_name, err);
                            return;
                        }
                    }
                    _ = &mut stopped => {
                        info!("Stopped {} controller", task_name);
                        return;
                    }
                }
            }
        });

        Self {
            name,
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the loop has exited, by request or because of an error
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Requests a stop and waits for any in-flight run to finish
    pub async fn stop(&mut self) {
        info!("Stopping {} controller", self.name);
        if let Some(stop) = self.stop.take() {
            // The loop may already be gone after a fatal error.
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                error!("{} controller task failed: {}", self.name, err);
            }
        }
    }
}
