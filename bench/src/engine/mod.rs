//! Transfer Engine
//!
//! Both strategies share one contract: given a channel, a local root and a remote root they
//! produce a [`TransferOutcome`]. They never return an error; every failure is recorded in the
//! outcome so the harness can always report.

pub mod bulk;
pub mod mirror;

use common::{Error, Phase, Strategy, TransferOutcome};
use remote::Channel;
use tokio_util::sync::CancellationToken;

pub use bulk::BulkTransfer;
pub use mirror::MirrorTransfer;

/// What to transfer where, and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    local_root: std::path::PathBuf,
    remote_root: String,
    strategy: Strategy,
}

impl TransferPlan {
    pub fn new(
        local_root: impl Into<std::path::PathBuf>,
        remote_root: &str,
        strategy: Strategy,
    ) -> Self {
        Self {
            local_root: local_root.into(),
            remote_root: remote::path::normalize(remote_root),
            strategy,
        }
    }

    pub fn local_root(&self) -> &std::path::Path {
        &self.local_root
    }

    pub fn remote_root(&self) -> &str {
        &self.remote_root
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSettings {
    /// Where bulk archives are written, system temp directory when unset
    pub staging_dir: Option<std::path::PathBuf>,
}

#[async_trait::async_trait]
pub trait TransferStrategy: Send + Sync {
    fn kind(&self) -> Strategy;

    /// Replace the contents of `remote_root` with the tree at `local_root`
    ///
    /// Cancellation is honored between phases and between files.
    async fn upload(
        &self,
        channel: &dyn Channel,
        local_root: &std::path::Path,
        remote_root: &str,
        cancel: &CancellationToken,
    ) -> TransferOutcome;
}

pub fn strategy_for(strategy: Strategy, settings: &EngineSettings) -> Box<dyn TransferStrategy> {
    match strategy {
        Strategy::Bulk => Box::new(BulkTransfer::new(settings.staging_dir.clone())),
        Strategy::Mirror => Box::new(MirrorTransfer),
    }
}

/// Execute `plan` over `channel`
pub async fn upload(
    channel: &dyn Channel,
    plan: &TransferPlan,
    settings: &EngineSettings,
    cancel: &CancellationToken,
) -> TransferOutcome {
    strategy_for(plan.strategy(), settings)
        .upload(channel, plan.local_root(), plan.remote_root(), cancel)
        .await
}

pub(crate) fn check_cancelled(cancel: &CancellationToken) -> Result<(), Error> {
    if cancel.is_cancelled() {
        return Err(Error::Interrupted);
    }
    Ok(())
}

/// Await `fut`, adding its wall-clock duration to `phase`
pub(crate) async fn timed<F: std::future::Future>(
    outcome: &mut TransferOutcome,
    phase: Phase,
    fut: F,
) -> F::Output {
    let start = std::time::Instant::now();
    let output = fut.await;
    let elapsed = start.elapsed();
    tracing::info!("{} phase: {:?}", phase, elapsed);
    outcome.record_phase(phase, elapsed);
    output
}
