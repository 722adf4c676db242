//! Upload benchmark - archive-and-extract (`bulk`) versus per-file mirroring (`mirror`)
//!
//! `xferbench` uploads the same local tree to a remote host twice over SSH and reports which
//! approach was faster:
//!
//! - **bulk**: pack the tree into one `.tar.gz`, upload it, extract it with the remote `tar`
//! - **mirror**: recreate the directory structure remotely and upload every file on its own
//!
//! Each strategy gets a fresh channel and a freshly emptied remote directory. Strategies run one
//! after the other by default, or at the same time with `--schedule concurrent` (which requires
//! separate remote directories).
//!
//! # Examples
//!
//! ```bash
//! # compare both strategies against a POSIX host
//! xferbench -H build01 -u deploy -l ./assets -r /srv/upload/xferbench
//!
//! # Windows host with OpenSSH, JSON output
//! xferbench -H 10.0.0.5 -u admin -l ./files -r C:/Uploads/test --dialect powershell --json
//!
//! # local baseline without any network
//! xferbench --loopback -l ./assets -r /tmp/xferbench/bulk --mirror-remote-dir /tmp/xferbench/mirror
//! ```
//!
//! # Modules
//!
//! - [`engine`]: the two transfer strategies behind one trait
//! - [`harness`]: runs both strategies and builds the [`common::BenchmarkReport`]
//! - [`report`]: text and JSON renderings of the report

pub mod engine;
pub mod harness;
pub mod report;

pub use engine::{EngineSettings, TransferPlan, TransferStrategy};
pub use harness::BenchmarkPlan;
