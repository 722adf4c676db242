//! Results produced by the transfer strategies and the benchmark harness

use crate::error::Error;
use crate::walk::TreeStats;

/// Which of the two strategies produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, serde::Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Archive, upload the single archive, extract remotely
    Bulk,
    /// Recreate the directory structure and upload each file individually
    Mirror,
}

/// A timed sub-step of a strategy
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, serde::Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Archive,
    /// Clearing and recreating the remote root
    Prepare,
    Upload,
    Extract,
}

impl Phase {
    /// Whether the phase is part of a strategy's total time
    ///
    /// Preparing the remote root is identical for both strategies and is reported separately.
    pub fn counts_toward_total(self) -> bool {
        !matches!(self, Phase::Prepare)
    }
}

/// How the harness schedules the two strategies relative to each other
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    serde::Serialize,
    clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    /// Bulk runs to completion (including channel teardown) before Mirror starts
    #[default]
    Sequential,
    /// Both run at once on independent channels and are joined at the end
    Concurrent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub relative_path: String,
    pub error: Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferOutcome {
    pub strategy: Strategy,
    /// Durations of the phases that actually executed
    pub phase_timings: std::collections::BTreeMap<Phase, std::time::Duration>,
    pub files_attempted: u64,
    pub files_succeeded: u64,
    pub files_failed: u64,
    pub bytes_transferred: u64,
    pub success: bool,
    /// Set when cancellation stopped the strategy early
    pub interrupted: bool,
    /// Strategy-level failure, if any
    pub error: Option<Error>,
    /// Per-file failures (mirror only)
    pub failures: Vec<FileFailure>,
}

impl TransferOutcome {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            phase_timings: Default::default(),
            files_attempted: 0,
            files_succeeded: 0,
            files_failed: 0,
            bytes_transferred: 0,
            success: false,
            interrupted: false,
            error: None,
            failures: Vec::new(),
        }
    }

    /// Outcome of a strategy that failed before doing any work
    pub fn failed(strategy: Strategy, error: Error) -> Self {
        let mut outcome = Self::new(strategy);
        outcome.fail(error);
        outcome
    }

    pub fn record_phase(&mut self, phase: Phase, duration: std::time::Duration) {
        *self.phase_timings.entry(phase).or_default() += duration;
    }

    pub fn phase(&self, phase: Phase) -> Option<std::time::Duration> {
        self.phase_timings.get(&phase).copied()
    }

    /// Sum of the counted phases; phases that never ran contribute zero
    pub fn total_time(&self) -> std::time::Duration {
        self.phase_timings
            .iter()
            .filter(|(phase, _)| phase.counts_toward_total())
            .map(|(_, duration)| *duration)
            .sum()
    }

    pub fn record_file_success(&mut self, bytes: u64) {
        self.files_attempted += 1;
        self.files_succeeded += 1;
        self.bytes_transferred += bytes;
    }

    pub fn record_file_failure(&mut self, relative_path: &str, error: Error) {
        self.files_attempted += 1;
        self.files_failed += 1;
        self.failures.push(FileFailure {
            relative_path: relative_path.to_string(),
            error,
        });
    }

    /// Record a strategy-level failure
    pub fn fail(&mut self, error: Error) {
        if error == Error::Interrupted {
            self.interrupted = true;
        }
        self.success = false;
        self.error = Some(error);
    }

    /// Human readable failure description, if anything failed
    pub fn error_detail(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(error.to_string());
        }
        self.failures.first().map(|first| {
            format!(
                "{} of {} files failed, first: {}: {}",
                self.files_failed, self.files_attempted, first.relative_path, first.error
            )
        })
    }
}

/// Strategy with the lower total time
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Bulk,
    Mirror,
    /// Totals are exactly equal; practically unreachable with real timings
    Tie,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    pub schedule: Schedule,
    pub tree: TreeStats,
    pub bulk: TransferOutcome,
    pub mirror: TransferOutcome,
    pub winner: Winner,
    /// Mirror total minus bulk total; positive means bulk was faster
    pub delta_seconds: f64,
}

impl BenchmarkReport {
    pub fn new(
        schedule: Schedule,
        tree: TreeStats,
        bulk: TransferOutcome,
        mirror: TransferOutcome,
    ) -> Self {
        let bulk_total = bulk.total_time();
        let mirror_total = mirror.total_time();
        let winner = match bulk_total.cmp(&mirror_total) {
            std::cmp::Ordering::Less => Winner::Bulk,
            std::cmp::Ordering::Greater => Winner::Mirror,
            std::cmp::Ordering::Equal => Winner::Tie,
        };
        Self {
            schedule,
            tree,
            delta_seconds: mirror_total.as_secs_f64() - bulk_total.as_secs_f64(),
            bulk,
            mirror,
            winner,
        }
    }

    /// Bulk total divided by mirror total, `None` when mirror took no measurable time
    pub fn speed_ratio(&self) -> Option<f64> {
        let mirror_total = self.mirror.total_time().as_secs_f64();
        if mirror_total > 0.0 {
            Some(self.bulk.total_time().as_secs_f64() / mirror_total)
        } else {
            None
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.bulk.success && self.mirror.success
    }

    pub fn interrupted(&self) -> bool {
        self.bulk.interrupted || self.mirror.interrupted
    }
}
