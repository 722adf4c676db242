//! Benchmark Harness
//!
//! Runs both strategies against the same local input, each on its own channel, and turns the two
//! outcomes into a [`BenchmarkReport`]. A run always produces a report: connection failures and
//! strategy failures are recorded in the corresponding outcome.

use anyhow::Context;
use common::{BenchmarkReport, Error, Schedule, Strategy, TransferOutcome, TreeStats};
use remote::Connector;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::engine::{self, EngineSettings, TransferPlan};

/// Inputs of one benchmark run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkPlan {
    local_root: std::path::PathBuf,
    bulk_remote_root: String,
    mirror_remote_root: String,
    schedule: Schedule,
    settings: EngineSettings,
}

impl BenchmarkPlan {
    /// Validate the inputs of a run
    ///
    /// The local root must exist. Under [`Schedule::Concurrent`] the two strategies must target
    /// different remote roots since each one clears its root first.
    pub fn new(
        local_root: impl Into<std::path::PathBuf>,
        bulk_remote_root: &str,
        mirror_remote_root: &str,
        schedule: Schedule,
    ) -> anyhow::Result<Self> {
        let local_root = local_root.into();
        std::fs::metadata(&local_root)
            .with_context(|| format!("local path {local_root:?} is not accessible"))?;
        let bulk_remote_root = remote::path::normalize(bulk_remote_root);
        let mirror_remote_root = remote::path::normalize(mirror_remote_root);
        for root in [&bulk_remote_root, &mirror_remote_root] {
            if remote::path::is_root(root) {
                anyhow::bail!("refusing to use {:?} as a remote directory", root);
            }
        }
        if schedule == Schedule::Concurrent && bulk_remote_root == mirror_remote_root {
            anyhow::bail!(
                "concurrent runs need distinct remote directories, both strategies target {:?}",
                bulk_remote_root
            );
        }
        Ok(Self {
            local_root,
            bulk_remote_root,
            mirror_remote_root,
            schedule,
            settings: EngineSettings::default(),
        })
    }

    pub fn with_staging_dir(mut self, staging_dir: Option<std::path::PathBuf>) -> Self {
        self.settings.staging_dir = staging_dir;
        self
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn local_root(&self) -> &std::path::Path {
        &self.local_root
    }

    pub fn transfer_plan(&self, strategy: Strategy) -> TransferPlan {
        let remote_root = match strategy {
            Strategy::Bulk => &self.bulk_remote_root,
            Strategy::Mirror => &self.mirror_remote_root,
        };
        TransferPlan::new(self.local_root.clone(), remote_root, strategy)
    }
}

/// Connect, run one strategy, disconnect
#[instrument(skip(connector, plan, settings, cancel), fields(strategy = %plan.strategy()))]
async fn run_strategy(
    connector: &dyn Connector,
    plan: TransferPlan,
    settings: &EngineSettings,
    cancel: &CancellationToken,
) -> TransferOutcome {
    if cancel.is_cancelled() {
        return TransferOutcome::failed(plan.strategy(), Error::Interrupted);
    }
    let channel = match connector.connect().await {
        Ok(channel) => channel,
        Err(error) => {
            tracing::error!("failed to connect to {}: {}", connector.describe(), error);
            return TransferOutcome::failed(plan.strategy(), Error::Auth(error.to_string()));
        }
    };
    let outcome = engine::upload(channel.as_ref(), &plan, settings, cancel).await;
    if let Err(error) = channel.close().await {
        tracing::warn!("failed to close channel to {}: {}", connector.describe(), error);
    }
    tracing::info!(
        "{} finished: success={}, total={:?}",
        plan.strategy(),
        outcome.success,
        outcome.total_time()
    );
    outcome
}

/// Run both strategies and compare them
#[instrument(skip_all, fields(schedule = %plan.schedule()))]
pub async fn run(
    connector: &dyn Connector,
    plan: &BenchmarkPlan,
    cancel: &CancellationToken,
) -> BenchmarkReport {
    let tree = match common::walk::scan(&plan.local_root).await {
        Ok(entries) => TreeStats::of(&entries),
        Err(error) => {
            tracing::warn!("failed to scan {:?}: {}", plan.local_root, error);
            TreeStats::default()
        }
    };
    tracing::info!(
        "benchmarking {:?} ({}) against {}",
        plan.local_root,
        tree,
        connector.describe()
    );
    let bulk_plan = plan.transfer_plan(Strategy::Bulk);
    let mirror_plan = plan.transfer_plan(Strategy::Mirror);
    let (bulk, mirror) = match plan.schedule {
        Schedule::Sequential => {
            let bulk = run_strategy(connector, bulk_plan, &plan.settings, cancel).await;
            let mirror = run_strategy(connector, mirror_plan, &plan.settings, cancel).await;
            (bulk, mirror)
        }
        Schedule::Concurrent => tokio::join!(
            run_strategy(connector, bulk_plan, &plan.settings, cancel),
            run_strategy(connector, mirror_plan, &plan.settings, cancel)
        ),
    };
    BenchmarkReport::new(plan.schedule, tree, bulk, mirror)
}
