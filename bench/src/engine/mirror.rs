//! Mirror strategy: recreate the tree on the remote host one file at a time
//!
//! A failed file is recorded and the walk moves on. Remote directories are created lazily, the
//! first time a file needs them, and remembered for the rest of the run.

use common::{Error, FileEntry, Phase, Strategy, TransferOutcome};
use remote::{Channel, CreatedDirs, RemoteDirs};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{TransferStrategy, check_cancelled, timed};

#[derive(Debug, Clone, Copy, Default)]
pub struct MirrorTransfer;

async fn upload_file(
    channel: &dyn Channel,
    dirs: &RemoteDirs<'_>,
    entry: &FileEntry,
    remote_path: &str,
    created: &mut CreatedDirs,
) -> Result<u64, Error> {
    if let Some(parent) = remote::path::parent(remote_path) {
        dirs.ensure_dir_cached(&parent, created).await?;
    }
    channel
        .put(&entry.local_path, remote_path)
        .await
        .map_err(remote::put_error)
}

impl MirrorTransfer {
    async fn mirror_files(
        &self,
        outcome: &mut TransferOutcome,
        channel: &dyn Channel,
        dirs: &RemoteDirs<'_>,
        local_root: &std::path::Path,
        remote_root: &str,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let entries = common::walk::scan(local_root).await?;
        tracing::info!("mirroring {} files to {:?}", entries.len(), remote_root);
        let mut created = CreatedDirs::new();
        created.insert(remote_root);
        for entry in &entries {
            check_cancelled(cancel)?;
            let remote_path = remote::path::join(remote_root, &entry.relative_path);
            match upload_file(channel, dirs, entry, &remote_path, &mut created).await {
                Ok(bytes) => {
                    tracing::debug!("uploaded {:?} ({} bytes)", entry.relative_path, bytes);
                    outcome.record_file_success(bytes);
                }
                Err(error) => {
                    tracing::warn!("failed to upload {:?}: {}", entry.relative_path, error);
                    outcome.record_file_failure(&entry.relative_path, error);
                }
            }
        }
        tracing::debug!("created {} remote directories", created.len());
        Ok(())
    }

    async fn run(
        &self,
        outcome: &mut TransferOutcome,
        channel: &dyn Channel,
        local_root: &std::path::Path,
        remote_root: &str,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        check_cancelled(cancel)?;
        let dirs = RemoteDirs::new(channel);
        timed(outcome, Phase::Prepare, dirs.prepare_root(remote_root)).await?;
        check_cancelled(cancel)?;
        // the walk is part of the measured upload
        let start = std::time::Instant::now();
        let result = self
            .mirror_files(outcome, channel, &dirs, local_root, remote_root, cancel)
            .await;
        outcome.record_phase(Phase::Upload, start.elapsed());
        result
    }
}

#[async_trait::async_trait]
impl TransferStrategy for MirrorTransfer {
    fn kind(&self) -> Strategy {
        Strategy::Mirror
    }

    #[instrument(skip(self, channel, cancel))]
    async fn upload(
        &self,
        channel: &dyn Channel,
        local_root: &std::path::Path,
        remote_root: &str,
        cancel: &CancellationToken,
    ) -> TransferOutcome {
        let mut outcome = TransferOutcome::new(Strategy::Mirror);
        match self
            .run(&mut outcome, channel, local_root, remote_root, cancel)
            .await
        {
            Ok(()) => {
                outcome.success = outcome.files_failed == 0;
                if !outcome.success {
                    tracing::error!(
                        "mirror transfer to {:?}: {} of {} files failed",
                        remote_root,
                        outcome.files_failed,
                        outcome.files_attempted
                    );
                }
            }
            Err(error) => {
                tracing::error!("mirror transfer to {:?} failed: {}", remote_root, error);
                outcome.fail(error);
            }
        }
        outcome
    }
}
