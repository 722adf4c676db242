//! Report Formatter
//!
//! Text and JSON renderings of a [`BenchmarkReport`]. Neither rendering recomputes anything: the
//! winner and the delta come straight from the report.

use common::{BenchmarkReport, Phase, Strategy, TransferOutcome, Winner};

fn seconds(duration: std::time::Duration) -> f64 {
    duration.as_secs_f64()
}

fn phases(strategy: Strategy) -> &'static [Phase] {
    match strategy {
        Strategy::Bulk => &[Phase::Archive, Phase::Prepare, Phase::Upload, Phase::Extract],
        Strategy::Mirror => &[Phase::Prepare, Phase::Upload],
    }
}

fn title(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Bulk => "Bulk transfer (archive, upload, extract)",
        Strategy::Mirror => "Mirror transfer (per-file upload)",
    }
}

/// Human readable rendering of a [`BenchmarkReport`]
pub struct TextReport<'a>(pub &'a BenchmarkReport);

impl TextReport<'_> {
    fn outcome(f: &mut std::fmt::Formatter, outcome: &TransferOutcome) -> std::fmt::Result {
        writeln!(f, "\n{}:", title(outcome.strategy))?;
        for phase in phases(outcome.strategy) {
            match outcome.phase(*phase) {
                Some(duration) => writeln!(f, "  {phase:<8} {:>10.2}s", seconds(duration))?,
                None => writeln!(f, "  {phase:<8} {:>11}", "-")?,
            }
        }
        writeln!(f, "  {:<8} {:>10.2}s", "total", seconds(outcome.total_time()))?;
        writeln!(
            f,
            "  files attempted: {}, succeeded: {}, failed: {}",
            outcome.files_attempted, outcome.files_succeeded, outcome.files_failed
        )?;
        writeln!(
            f,
            "  bytes sent: {}",
            bytesize::ByteSize(outcome.bytes_transferred)
        )?;
        writeln!(f, "  success: {}", outcome.success)?;
        if outcome.interrupted {
            writeln!(f, "  interrupted before completion")?;
        }
        if let Some(detail) = outcome.error_detail() {
            writeln!(f, "  error: {detail}")?;
        }
        Ok(())
    }
}

impl std::fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let report = self.0;
        writeln!(f, "Transfer benchmark ({} schedule)", report.schedule)?;
        writeln!(f, "\nInput: {}", report.tree)?;
        Self::outcome(f, &report.bulk)?;
        Self::outcome(f, &report.mirror)?;
        writeln!(f, "\nComparison:")?;
        let delta = report.delta_seconds.abs();
        match report.winner {
            Winner::Bulk => {
                writeln!(f, "  bulk was {delta:.2}s faster")?;
                if let Some(ratio) = report.speed_ratio().filter(|ratio| *ratio > 0.0) {
                    writeln!(f, "  bulk was {:.2}x faster than mirror", 1.0 / ratio)?;
                }
                writeln!(f, "  recommendation: use the bulk transfer")?;
            }
            Winner::Mirror => {
                writeln!(f, "  mirror was {delta:.2}s faster")?;
                if let Some(ratio) = report.speed_ratio() {
                    writeln!(f, "  mirror was {ratio:.2}x faster than bulk")?;
                }
                writeln!(f, "  recommendation: use the mirror transfer")?;
            }
            Winner::Tie => {
                writeln!(f, "  both strategies took exactly the same time")?;
            }
        }
        if report.interrupted() {
            writeln!(f, "\nWARNING: the run was interrupted, timings are partial")?;
        } else if !report.all_succeeded() {
            writeln!(
                f,
                "\nWARNING: at least one strategy failed, the comparison may be meaningless"
            )?;
        }
        Ok(())
    }
}

#[derive(serde::Serialize)]
struct ErrorView {
    kind: common::ErrorKind,
    message: String,
}

#[derive(serde::Serialize)]
struct FailureView<'a> {
    relative_path: &'a str,
    kind: common::ErrorKind,
    message: String,
}

#[derive(serde::Serialize)]
struct OutcomeView<'a> {
    strategy: Strategy,
    phase_seconds: std::collections::BTreeMap<Phase, f64>,
    total_seconds: f64,
    files_attempted: u64,
    files_succeeded: u64,
    files_failed: u64,
    bytes_transferred: u64,
    success: bool,
    interrupted: bool,
    error: Option<ErrorView>,
    error_detail: Option<String>,
    failures: Vec<FailureView<'a>>,
}

impl<'a> From<&'a TransferOutcome> for OutcomeView<'a> {
    fn from(outcome: &'a TransferOutcome) -> Self {
        Self {
            strategy: outcome.strategy,
            phase_seconds: outcome
                .phase_timings
                .iter()
                .map(|(phase, duration)| (*phase, seconds(*duration)))
                .collect(),
            total_seconds: seconds(outcome.total_time()),
            files_attempted: outcome.files_attempted,
            files_succeeded: outcome.files_succeeded,
            files_failed: outcome.files_failed,
            bytes_transferred: outcome.bytes_transferred,
            success: outcome.success,
            interrupted: outcome.interrupted,
            error: outcome.error.as_ref().map(|error| ErrorView {
                kind: error.kind(),
                message: error.to_string(),
            }),
            error_detail: outcome.error_detail(),
            failures: outcome
                .failures
                .iter()
                .map(|failure| FailureView {
                    relative_path: &failure.relative_path,
                    kind: failure.error.kind(),
                    message: failure.error.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(serde::Serialize)]
struct ReportView<'a> {
    schedule: common::Schedule,
    tree: common::TreeStats,
    bulk: OutcomeView<'a>,
    mirror: OutcomeView<'a>,
    winner: Winner,
    delta_seconds: f64,
    speed_ratio: Option<f64>,
}

/// Pretty-printed JSON rendering of a [`BenchmarkReport`]
pub fn render_json(report: &BenchmarkReport) -> anyhow::Result<String> {
    let view = ReportView {
        schedule: report.schedule,
        tree: report.tree,
        bulk: OutcomeView::from(&report.bulk),
        mirror: OutcomeView::from(&report.mirror),
        winner: report.winner,
        delta_seconds: report.delta_seconds,
        speed_ratio: report.speed_ratio(),
    };
    Ok(serde_json::to_string_pretty(&view)?)
}
