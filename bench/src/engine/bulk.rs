//! Bulk strategy: archive locally, upload one file, extract remotely
//!
//! Success is all-or-nothing: either every archived file reached the remote root or none is
//! counted as transferred.

use common::{Error, Phase, Strategy, TransferOutcome};
use remote::{Channel, RemoteDirs};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{TransferStrategy, check_cancelled, timed};

/// Removes the local archive when dropped
struct LocalArchive(std::path::PathBuf);

impl Drop for LocalArchive {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => tracing::debug!("removed local archive {:?}", self.0),
            Err(error) => tracing::warn!("failed to remove local archive {:?}: {}", self.0, error),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BulkTransfer {
    staging_dir: Option<std::path::PathBuf>,
}

impl BulkTransfer {
    pub fn new(staging_dir: Option<std::path::PathBuf>) -> Self {
        Self { staging_dir }
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
        let archive = timed(
            outcome,
            Phase::Archive,
            common::archive::archive_async(local_root.to_path_buf(), self.staging_dir.clone()),
        )
        .await?;
        let _guard = LocalArchive(archive.path.clone());
        outcome.files_attempted = archive.entries;
        tracing::info!(
            "archived {} files ({}) into {:?} ({})",
            archive.entries,
            bytesize::ByteSize(archive.source_bytes),
            archive.path,
            bytesize::ByteSize(archive.archive_bytes)
        );
        let archive_name = archive
            .file_name()
            .ok_or_else(|| Error::local_io(&archive.path, "archive name is not valid UTF-8"))?
            .to_string();

        check_cancelled(cancel)?;
        let dirs = RemoteDirs::new(channel);
        timed(outcome, Phase::Prepare, dirs.prepare_root(remote_root)).await?;

        check_cancelled(cancel)?;
        let remote_archive = remote::path::join(remote_root, &archive_name);
        let uploaded = timed(
            outcome,
            Phase::Upload,
            channel.put(&archive.path, &remote_archive),
        )
        .await
        .map_err(remote::put_error)?;
        outcome.bytes_transferred = uploaded;

        let extracted = match check_cancelled(cancel) {
            Ok(()) => timed(
                outcome,
                Phase::Extract,
                dirs.extract_archive(&remote_archive, remote_root),
            )
            .await
            .map_err(Error::from),
            Err(error) => Err(error),
        };
        if let Err(error) = dirs.remove_file(&remote_archive).await {
            tracing::warn!(
                "failed to remove remote archive {:?}: {}",
                remote_archive,
                error
            );
        }
        extracted
    }
}

#[async_trait::async_trait]
impl TransferStrategy for BulkTransfer {
    fn kind(&self) -> Strategy {
        Strategy::Bulk
    }

    #[instrument(skip(self, channel, cancel))]
    async fn upload(
        &self,
        channel: &dyn Channel,
        local_root: &std::path::Path,
        remote_root: &str,
        cancel: &CancellationToken,
    ) -> TransferOutcome {
        let mut outcome = TransferOutcome::new(Strategy::Bulk);
        match self
            .run(&mut outcome, channel, local_root, remote_root, cancel)
            .await
        {
            Ok(()) => {
                outcome.files_succeeded = outcome.files_attempted;
                outcome.success = true;
            }
            Err(error) => {
                tracing::error!("bulk transfer to {:?} failed: {}", remote_root, error);
                outcome.files_failed = outcome.files_attempted;
                outcome.fail(error);
            }
        }
        outcome
    }
}
