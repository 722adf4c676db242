//! Error kinds shared by both transfer strategies
//!
//! A strategy never propagates these out of the engine: every failure ends up
//! stored in a [`crate::TransferOutcome`] so that the harness can always build a
//! complete report.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Reading the local tree or writing the local archive failed
    #[error("local I/O error: {0}")]
    LocalIo(String),

    /// A remote directory or extraction command exited unsuccessfully
    #[error("remote command failed ({}): {diagnostic}", describe_status(.status))]
    RemoteCommand {
        status: Option<i32>,
        diagnostic: String,
    },

    /// Uploading a file over the channel failed
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// The channel could not be established
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Cancellation was requested before the strategy finished
    #[error("interrupted before completion")]
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, serde::Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LocalIo,
    RemoteCommand,
    Transfer,
    Auth,
    Interrupted,
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated without exit status".to_string(),
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::LocalIo(_) => ErrorKind::LocalIo,
            Error::RemoteCommand { .. } => ErrorKind::RemoteCommand,
            Error::Transfer(_) => ErrorKind::Transfer,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Interrupted => ErrorKind::Interrupted,
        }
    }

    /// Wrap a local I/O failure together with the path it happened on
    pub fn local_io(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Error::LocalIo(format!("{}: {}", path.display(), error))
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::LocalIo(error.to_string())
    }
}

impl From<walkdir::Error> for Error {
    fn from(error: walkdir::Error) -> Self {
        match error.path() {
            Some(path) => Error::local_io(path, &error),
            None => Error::LocalIo(error.to_string()),
        }
    }
}
