use std::path::PathBuf;
use std::process::Command;

use camino::Utf8Path;

use crate::error::IngestError;
use crate::fetch::find_in_path;

/// Captured rclone output, kept for the run log.
#[derive(Debug, Clone, Default)]
pub struct SyncOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

pub trait SyncClient: Send + Sync {
    /// Mirrors `local` to `remote_spec`. Files absent locally are removed
    /// remotely; renames are tracked; unchanged content is compared by
    /// checksum so modification-time-only differences are skipped.
    fn sync(&self, local: &Utf8Path, remote_spec: &str) -> Result<SyncOutput, IngestError>;
}

#[derive(Debug, Clone)]
pub struct RcloneSyncClient {
    rclone: Option<PathBuf>,
}

impl RcloneSyncClient {
    pub fn new() -> Self {
        Self {
            rclone: find_in_path("rclone"),
        }
    }

    fn require_rclone(&self) -> Result<&PathBuf, IngestError> {
        self.rclone
            .as_ref()
            .ok_or_else(|| IngestError::MissingTool("rclone".to_string()))
    }
}

impl Default for RcloneSyncClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncClient for RcloneSyncClient {
    fn sync(&self, local: &Utf8Path, remote_spec: &str) -> Result<SyncOutput, IngestError> {
        let rclone = self.require_rclone()?;
        tracing::info!(local = %local, remote = remote_spec, "running rclone sync");

        let output = Command::new(rclone)
            .arg("sync")
            .arg(local.as_str())
            .arg(remote_spec)
            .arg("--track-renames")
            .arg("--checksum")
            .output()
            .map_err(|err| IngestError::Sync(format!("rclone: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("rclone sync failed for {local}")
            } else {
                stderr
            };
            return Err(IngestError::Sync(message));
        }

        Ok(SyncOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
