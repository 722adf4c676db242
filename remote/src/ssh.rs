//! SSH channel built on `openssh`
//!
//! Uploads stream the local file into a remote `cat`/PowerShell writer over the session's stdin;
//! directory operations are dialect commands. Every operation is bounded by the idle timeout.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::channel::{
    Channel, ChannelConfig, ChannelError, CommandOutput, Connector, RemoteMetadata,
};
use crate::dialect::Dialect;

/// Where to connect and how to authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    /// Private key used instead of the agent and default identities
    pub identity: Option<std::path::PathBuf>,
}

impl SshTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            user: None,
            identity: None,
        }
    }
}

impl std::fmt::Display for SshTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SshConnector {
    target: SshTarget,
    dialect: Dialect,
    config: ChannelConfig,
}

impl SshConnector {
    pub fn new(target: SshTarget, dialect: Dialect, config: ChannelConfig) -> Self {
        Self {
            target,
            dialect,
            config,
        }
    }
}

#[async_trait::async_trait]
impl Connector for SshConnector {
    fn describe(&self) -> String {
        format!("ssh://{}", self.target)
    }

    async fn connect(&self) -> Result<Box<dyn Channel>, ChannelError> {
        let mut builder = openssh::SessionBuilder::default();
        builder
            .known_hosts_check(openssh::KnownHosts::Accept)
            .connect_timeout(self.config.connect_timeout);
        if let Some(user) = &self.target.user {
            builder.user(user.clone());
        }
        if let Some(port) = self.target.port {
            builder.port(port);
        }
        if let Some(identity) = &self.target.identity {
            builder.keyfile(identity);
        }
        tracing::debug!("connecting to {}", self.target);
        let session = tokio::time::timeout(
            self.config.connect_timeout,
            builder.connect(&self.target.host),
        )
        .await
        .map_err(|_| {
            ChannelError::Auth(format!(
                "{}: connection timed out after {:?}",
                self.target, self.config.connect_timeout
            ))
        })?
        .map_err(|err| ChannelError::Auth(format!("{}: {}", self.target, err)))?;
        tracing::info!("connected to {}", self.target);
        Ok(Box::new(SshChannel {
            session: tokio::sync::Mutex::new(Some(session)),
            dialect: self.dialect,
            idle_timeout: self.config.idle_timeout,
        }))
    }
}

/// Copy `source` into the stdin of a remote writer while collecting its stderr
///
/// `stdin` is shut down and dropped once the copy ends so the writer sees EOF.
async fn feed_writer<R, W, E>(
    source: &mut R,
    mut stdin: W,
    stderr: &mut E,
    remote_path: &str,
) -> (std::io::Result<u64>, std::io::Result<()>, Vec<u8>)
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
    E: tokio::io::AsyncRead + Unpin,
{
    let feed = async move {
        let copied = tokio::io::copy(source, &mut stdin).await;
        let shutdown = stdin.shutdown().await;
        (copied, shutdown)
    };
    // drain stderr while copying, the writer may report before reading stdin
    let drain = async {
        let mut data = Vec::new();
        if let Err(error) = stderr.read_to_end(&mut data).await {
            tracing::debug!(
                "failed reading stderr of writer for {:?}: {}",
                remote_path,
                error
            );
        }
        data
    };
    let ((copied, shutdown), data) = tokio::join!(feed, drain);
    (copied, shutdown, data)
}

pub struct SshChannel {
    session: tokio::sync::Mutex<Option<openssh::Session>>,
    dialect: Dialect,
    idle_timeout: std::time::Duration,
}

fn session_error(error: openssh::Error) -> ChannelError {
    ChannelError::Io(error.to_string())
}

fn diagnostic(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr).trim().to_string()
}

impl SshChannel {
    async fn bounded<T, Fut>(&self, operation: &'static str, fut: Fut) -> Result<T, ChannelError>
    where
        Fut: std::future::Future<Output = Result<T, ChannelError>>,
    {
        tokio::time::timeout(self.idle_timeout, fut)
            .await
            .map_err(|_| ChannelError::Timeout {
                operation,
                after: self.idle_timeout,
            })?
    }

    async fn run(&self, command: &str) -> Result<CommandOutput, ChannelError> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(ChannelError::Closed)?;
        tracing::trace!("ssh exec: {}", command);
        let output = session
            .raw_command(command)
            .output()
            .await
            .map_err(session_error)?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn upload(
        &self,
        local_path: &std::path::Path,
        remote_path: &str,
    ) -> Result<u64, ChannelError> {
        let mut file = tokio::fs::File::open(local_path)
            .await
            .map_err(|err| ChannelError::Local(format!("{}: {}", local_path.display(), err)))?;
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(ChannelError::Closed)?;
        let mut child = session
            .raw_command(self.dialect.write_file(remote_path))
            .stdin(openssh::Stdio::piped())
            .stdout(openssh::Stdio::null())
            .stderr(openssh::Stdio::piped())
            .spawn()
            .await
            .map_err(session_error)?;
        let stdin = child
            .stdin()
            .take()
            .ok_or_else(|| ChannelError::Io("remote writer has no stdin".to_string()))?;
        let mut stderr = child
            .stderr()
            .take()
            .ok_or_else(|| ChannelError::Io("remote writer has no stderr".to_string()))?;
        let (copied, shutdown, stderr_data) =
            feed_writer(&mut file, stdin, &mut stderr, remote_path).await;
        let status = child.wait().await.map_err(session_error)?;
        if !status.success() {
            let diagnostic = diagnostic(&stderr_data);
            if diagnostic.to_lowercase().contains("permission denied") {
                return Err(ChannelError::PermissionDenied(remote_path.to_string()));
            }
            return Err(ChannelError::Command {
                status: status.code(),
                diagnostic,
            });
        }
        let bytes = copied.map_err(|err| ChannelError::Io(format!("{remote_path}: {err}")))?;
        shutdown.map_err(|err| ChannelError::Io(format!("{remote_path}: {err}")))?;
        Ok(bytes)
    }

    async fn stat_path(&self, remote_path: &str) -> Result<RemoteMetadata, ChannelError> {
        let output = self.run(&self.dialect.stat(remote_path)).await?;
        if !output.success() {
            return Err(ChannelError::NotFound(remote_path.to_string()));
        }
        Ok(RemoteMetadata {
            is_dir: output.stdout.trim() == "d",
        })
    }

    async fn make_dir(&self, remote_path: &str) -> Result<(), ChannelError> {
        let output = self.run(&self.dialect.mkdir(remote_path)).await?;
        if output.success() {
            return Ok(());
        }
        match self.stat_path(remote_path).await {
            Ok(RemoteMetadata { is_dir: true }) => {
                return Err(ChannelError::AlreadyExists(remote_path.to_string()));
            }
            Ok(RemoteMetadata { is_dir: false }) => {
                return Err(ChannelError::NotADirectory(remote_path.to_string()));
            }
            Err(_) => {}
        }
        let diagnostic = output.diagnostic();
        if diagnostic.to_lowercase().contains("permission denied") {
            return Err(ChannelError::PermissionDenied(remote_path.to_string()));
        }
        Err(ChannelError::Command {
            status: output.status,
            diagnostic,
        })
    }
}

#[async_trait::async_trait]
impl Channel for SshChannel {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn put(
        &self,
        local_path: &std::path::Path,
        remote_path: &str,
    ) -> Result<u64, ChannelError> {
        self.bounded("upload", self.upload(local_path, remote_path))
            .await
    }

    async fn exec(&self, command: &str) -> Result<CommandOutput, ChannelError> {
        self.bounded("exec", self.run(command)).await
    }

    async fn stat(&self, remote_path: &str) -> Result<RemoteMetadata, ChannelError> {
        self.bounded("stat", self.stat_path(remote_path)).await
    }

    async fn mkdir(&self, remote_path: &str) -> Result<(), ChannelError> {
        self.bounded("mkdir", self.make_dir(remote_path)).await
    }

    async fn close(&self) -> Result<(), ChannelError> {
        let session = self.session.lock().await.take().ok_or(ChannelError::Closed)?;
        self.bounded("close", async {
            session.close().await.map_err(session_error)
        })
        .await
    }
}
