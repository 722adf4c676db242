use anyhow::Context;
use clap::Parser;

const LARGE_INPUT_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "xferbench",
    version,
    about = "Compare archive-and-extract against per-file mirroring when uploading a tree over SSH",
    long_about = "`xferbench` uploads the same local file or directory to a remote host twice and reports which approach was faster:

  bulk:   pack everything into one .tar.gz, upload it, extract it remotely with `tar`
  mirror: recreate the directory structure remotely and upload every file on its own

The remote directory is emptied before each strategy runs. The process exits with status 1 unless both strategies succeeded.

EXAMPLES:
    # Compare both strategies against a POSIX host
    xferbench -H build01 -u deploy -l ./assets -r /srv/upload/xferbench

    # Windows host running OpenSSH, machine readable output
    xferbench -H 10.0.0.5 -u admin -l ./files -r C:/Uploads/test --dialect powershell --json

    # Run both strategies at the same time, each into its own directory
    xferbench -H build01 -l ./assets -r /srv/bulk --mirror-remote-dir /srv/mirror --schedule concurrent

    # Local baseline, no network involved
    xferbench --loopback -l ./assets -r /tmp/xferbench/bulk --mirror-remote-dir /tmp/xferbench/mirror"
)]
struct Args {
    // Connection
    /// Remote host name or IP address
    #[arg(
        short = 'H',
        long,
        required_unless_present = "loopback",
        help_heading = "Connection"
    )]
    host: Option<String>,

    /// SSH port
    #[arg(
        long,
        default_value_t = 22,
        value_parser = clap::value_parser!(u16).range(1..),
        help_heading = "Connection"
    )]
    port: u16,

    /// Remote user, defaults to the SSH configuration
    #[arg(short = 'u', long, help_heading = "Connection")]
    user: Option<String>,

    /// Private key file used for authentication
    #[arg(short = 'i', long, value_name = "PATH", help_heading = "Connection")]
    identity: Option<std::path::PathBuf>,

    /// Shell syntax of the remote host
    #[arg(long, value_enum, default_value_t, help_heading = "Connection")]
    dialect: remote::Dialect,

    /// Treat the local filesystem as the remote host instead of connecting over SSH
    #[arg(long, conflicts_with = "host", help_heading = "Connection")]
    loopback: bool,

    /// Time allowed to establish a connection, e.g. "10s"
    #[arg(
        long,
        default_value = "10s",
        value_parser = humantime::parse_duration,
        value_name = "DURATION",
        help_heading = "Connection"
    )]
    connect_timeout: std::time::Duration,

    /// Upper bound on any single remote operation, e.g. "5min"
    #[arg(
        long,
        default_value = "5min",
        value_parser = humantime::parse_duration,
        value_name = "DURATION",
        help_heading = "Connection"
    )]
    idle_timeout: std::time::Duration,

    /// Skip the connectivity check performed before any work
    #[arg(long, help_heading = "Connection")]
    skip_preflight: bool,

    // Benchmark
    /// Local file or directory to upload
    #[arg(short = 'l', long, value_name = "PATH", help_heading = "Benchmark")]
    local_path: std::path::PathBuf,

    /// Remote directory the bulk strategy uploads into (and the mirror strategy too, unless
    /// --mirror-remote-dir is given)
    ///
    /// The directory is deleted and recreated before each strategy runs.
    #[arg(short = 'r', long, value_name = "DIR", help_heading = "Benchmark")]
    remote_dir: String,

    /// Remote directory for the mirror strategy, required to differ from --remote-dir with
    /// --schedule concurrent
    #[arg(long, value_name = "DIR", help_heading = "Benchmark")]
    mirror_remote_dir: Option<String>,

    /// Run the strategies one after the other or at the same time
    #[arg(long, value_enum, default_value_t, help_heading = "Benchmark")]
    schedule: common::Schedule,

    /// Directory for the temporary archive, defaults to the system temp directory
    #[arg(long, value_name = "DIR", help_heading = "Benchmark")]
    staging_dir: Option<std::path::PathBuf>,

    // Output
    /// Print the report as JSON
    #[arg(long, help_heading = "Output")]
    json: bool,

    /// Verbose level: -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Output")]
    verbose: u8,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Output")]
    quiet: bool,

    // Advanced settings
    /// Number of worker threads (0 = number of CPU cores)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_workers: usize,
}

fn connector(args: &Args) -> anyhow::Result<Box<dyn remote::Connector>> {
    if args.loopback {
        return Ok(Box::new(remote::LoopbackConnector));
    }
    let host = args
        .host
        .clone()
        .context("--host is required unless --loopback is given")?;
    let target = remote::SshTarget {
        host,
        port: Some(args.port),
        user: args.user.clone(),
        identity: args.identity.clone(),
    };
    let config = remote::ChannelConfig {
        connect_timeout: args.connect_timeout,
        idle_timeout: args.idle_timeout,
    };
    Ok(Box::new(remote::SshConnector::new(
        target,
        args.dialect,
        config,
    )))
}

async fn preflight(connector: &dyn remote::Connector) -> anyhow::Result<()> {
    tracing::info!("checking connectivity to {}", connector.describe());
    let channel = connector
        .connect()
        .await
        .with_context(|| format!("cannot connect to {}", connector.describe()))?;
    channel
        .close()
        .await
        .with_context(|| format!("failed to close test channel to {}", connector.describe()))?;
    Ok(())
}

async fn async_main(args: Args) -> anyhow::Result<bool> {
    let mirror_remote_dir = args
        .mirror_remote_dir
        .clone()
        .unwrap_or_else(|| args.remote_dir.clone());
    let plan = xferbench::BenchmarkPlan::new(
        &args.local_path,
        &args.remote_dir,
        &mirror_remote_dir,
        args.schedule,
    )?
    .with_staging_dir(args.staging_dir.clone());
    let input = common::walk::scan(&args.local_path)
        .await
        .with_context(|| format!("failed to read {:?}", args.local_path))?;
    let stats = common::TreeStats::of(&input);
    if stats.bytes > LARGE_INPUT_BYTES {
        tracing::warn!(
            "{:?} holds {}, uploads may run into --idle-timeout ({:?})",
            args.local_path,
            stats,
            args.idle_timeout
        );
    }
    let connector = connector(&args)?;
    if !args.skip_preflight {
        preflight(connector.as_ref()).await?;
    }
    let cancel = tokio_util::sync::CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, finishing the current step");
                cancel.cancel();
            }
        })
    };
    let report = xferbench::harness::run(connector.as_ref(), &plan, &cancel).await;
    interrupt.abort();
    if args.json {
        println!("{}", xferbench::report::render_json(&report)?);
    } else {
        print!("{}", xferbench::report::TextReport(&report));
    }
    Ok(report.all_succeeded())
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    let func = {
        let args = args.clone();
        || async_main(args)
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
    };
    if common::run(output, runtime, func) != Some(true) {
        std::process::exit(1);
    }
    Ok(())
}
