//! Named pipes for plugin logs
//!
//! A plugin gets the pipe's path in its input and may write log lines to
//! it while it runs. Every line is forwarded to `tracing` at `info`.
//! The pipe is opened read-write so the reader never sees end-of-file while
//! no plugin has it open (Linux semantics).

use anyhow::{Context, Result};
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::unix::pipe;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A FIFO plus the task draining it; removed again on drop
pub struct LogPipe {
    path: PathBuf,
    reader: JoinHandle<()>,
}

impl LogPipe {
    /// Creates a uniquely named FIFO in `dir` and starts forwarding it
    ///
    /// # Arguments
    /// * `dir` - Directory to create the pipe in
    /// * `prefix` - File name prefix, e.g. the controller's name
    pub async fn start(dir: &Path, prefix: &str) -> Result<Self> {
        let path = dir.join(format!("{}-{}", prefix, Uuid::new_v4()));

        mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR)
            .with_context(|| format!("Failed to create log pipe {}", path.display()))?;

        let receiver = pipe::OpenOptions::new()
            .read_write(true)
            .open_receiver(&path)
            .with_context(|| format!("Failed to open log pipe {}", path.display()))?;

        let name = path.display().to_string();
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(receiver).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => info!(target: "tko_controllers::plugins", "{}", line),
                    Ok(None) => break,
                    Err(err) => {
                        warn!("Failed to read log pipe {}: {}", name, err);
                        break;
                    }
                }
            }
        });

        debug!("Log pipe created: {}", path.display());
        Ok(Self { path, reader })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LogPipe {
    fn drop(&mut self) {
        self.reader.abort();
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove log pipe {}: {}", self.path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::{FileTypeExt, PermissionsExt};

    #[tokio::test]
    async fn test_pipe_is_created_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let pipe = LogPipe::start(dir.path(), "tko-test").await.unwrap();
        let path = pipe.path().to_path_buf();

        assert!(path.exists());
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(std::fs::metadata(&path).unwrap().file_type().is_fifo());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("tko-test-"));

        // Writing must not block while the reader drains the pipe
        let mut sender = pipe::OpenOptions::new().open_sender(&path).unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut sender, b"hello from plugin\n")
            .await
            .unwrap();

        drop(pipe);
        assert!(!path.exists());
    }
}
