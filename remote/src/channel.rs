//! The narrow remote-channel capability used by both strategies
//!
//! A channel can upload a file, run a command, stat a path, create one directory and close.
//! Strategies only ever see `&dyn Channel`, so tests can substitute the loopback channel or a
//! scripted wrapper for a real SSH session.

use crate::dialect::Dialect;

/// Result of a remote command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the command was terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Text to attach to an error, stderr preferred over stdout
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub is_dir: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to establish channel: {0}")]
    Auth(String),

    #[error("no such remote path: {0}")]
    NotFound(String),

    #[error("remote path already exists: {0}")]
    AlreadyExists(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("remote path exists and is not a directory: {0}")]
    NotADirectory(String),

    #[error("remote command exited with {status:?}: {diagnostic}")]
    Command {
        status: Option<i32>,
        diagnostic: String,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: std::time::Duration,
    },

    #[error("channel I/O error: {0}")]
    Io(String),

    /// Reading the local side of an upload failed
    #[error("{0}")]
    Local(String),

    #[error("channel is closed")]
    Closed,
}

impl From<ChannelError> for common::Error {
    fn from(error: ChannelError) -> Self {
        match error {
            ChannelError::Auth(message) => common::Error::Auth(message),
            ChannelError::Command { status, diagnostic } => {
                common::Error::RemoteCommand { status, diagnostic }
            }
            ChannelError::Local(message) => common::Error::LocalIo(message),
            error @ ChannelError::NotADirectory(_) => common::Error::RemoteCommand {
                status: None,
                diagnostic: error.to_string(),
            },
            other => common::Error::Transfer(other.to_string()),
        }
    }
}

/// Map an upload failure; anything not caused by the local file is a transfer error
pub fn put_error(error: ChannelError) -> common::Error {
    match error {
        ChannelError::Local(message) => common::Error::LocalIo(message),
        other => common::Error::Transfer(other.to_string()),
    }
}

/// Timeouts applied when establishing and using a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub connect_timeout: std::time::Duration,
    /// Upper bound on any single operation
    pub idle_timeout: std::time::Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: std::time::Duration::from_secs(10),
            idle_timeout: std::time::Duration::from_secs(300),
        }
    }
}

/// An established connection to the remote host
#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    /// Command syntax understood by the remote shell
    fn dialect(&self) -> Dialect;

    /// Upload the local file to `remote_path`, returning the number of bytes sent
    ///
    /// The parent directory must already exist.
    async fn put(&self, local_path: &std::path::Path, remote_path: &str)
    -> Result<u64, ChannelError>;

    /// Run a command through the remote shell
    ///
    /// A non-zero exit is reported in [`CommandOutput::status`], not as an error.
    async fn exec(&self, command: &str) -> Result<CommandOutput, ChannelError>;

    async fn stat(&self, remote_path: &str) -> Result<RemoteMetadata, ChannelError>;

    /// Create a single directory whose parent exists
    async fn mkdir(&self, remote_path: &str) -> Result<(), ChannelError>;

    /// Release the channel; later operations fail with [`ChannelError::Closed`]
    async fn close(&self) -> Result<(), ChannelError>;
}

/// Factory for channels, one per strategy run
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Human readable destination, used in logs and reports
    fn describe(&self) -> String;

    async fn connect(&self) -> Result<Box<dyn Channel>, ChannelError>;
}
