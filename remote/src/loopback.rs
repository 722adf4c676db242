//! A channel whose "remote host" is the local filesystem
//!
//! Remote paths are interpreted as local paths and commands run through the local `sh`. Useful for
//! measuring the strategies without network latency and for exercising them in tests.

use crate::channel::{Channel, ChannelError, CommandOutput, Connector, RemoteMetadata};
use crate::dialect::Dialect;

fn io_error(path: &str, error: std::io::Error) -> ChannelError {
    match error.kind() {
        std::io::ErrorKind::NotFound => ChannelError::NotFound(path.to_string()),
        std::io::ErrorKind::AlreadyExists => ChannelError::AlreadyExists(path.to_string()),
        std::io::ErrorKind::PermissionDenied => ChannelError::PermissionDenied(path.to_string()),
        _ => ChannelError::Io(format!("{path}: {error}")),
    }
}

#[derive(Debug, Default)]
pub struct LoopbackChannel {
    closed: std::sync::atomic::AtomicBool,
}

impl LoopbackChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(&self) -> Result<(), ChannelError> {
        if self.closed.load(std::sync::atomic::Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Channel for LoopbackChannel {
    fn dialect(&self) -> Dialect {
        Dialect::Posix
    }

    async fn put(
        &self,
        local_path: &std::path::Path,
        remote_path: &str,
    ) -> Result<u64, ChannelError> {
        self.check_open()?;
        tokio::fs::metadata(local_path)
            .await
            .map_err(|err| ChannelError::Local(format!("{}: {}", local_path.display(), err)))?;
        tokio::fs::copy(local_path, remote_path)
            .await
            .map_err(|err| io_error(remote_path, err))
    }

    async fn exec(&self, command: &str) -> Result<CommandOutput, ChannelError> {
        self.check_open()?;
        tracing::trace!("loopback exec: {}", command);
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|err| ChannelError::Io(format!("failed to run sh: {err}")))?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn stat(&self, remote_path: &str) -> Result<RemoteMetadata, ChannelError> {
        self.check_open()?;
        let metadata = tokio::fs::metadata(remote_path)
            .await
            .map_err(|err| io_error(remote_path, err))?;
        Ok(RemoteMetadata {
            is_dir: metadata.is_dir(),
        })
    }

    async fn mkdir(&self, remote_path: &str) -> Result<(), ChannelError> {
        self.check_open()?;
        match tokio::fs::create_dir(remote_path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
                match tokio::fs::metadata(remote_path).await {
                    Ok(metadata) if metadata.is_dir() => {
                        Err(ChannelError::AlreadyExists(remote_path.to_string()))
                    }
                    _ => Err(ChannelError::NotADirectory(remote_path.to_string())),
                }
            }
            Err(error) => Err(io_error(remote_path, error)),
        }
    }

    async fn close(&self) -> Result<(), ChannelError> {
        if self
            .closed
            .swap(true, std::sync::atomic::Ordering::AcqRel)
        {
            return Err(ChannelError::Closed);
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoopbackConnector;

#[async_trait::async_trait]
impl Connector for LoopbackConnector {
    fn describe(&self) -> String {
        "loopback".to_string()
    }

    async fn connect(&self) -> Result<Box<dyn Channel>, ChannelError> {
        Ok(Box::new(LoopbackChannel::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(path: &std::path::Path) -> String {
        path.to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn put_copies_and_reports_size() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src.bin");
        std::fs::write(&src, vec![1u8; 1500]).unwrap();
        let channel = LoopbackChannel::new();
        let dst = tmp.path().join("dst.bin");
        assert_eq!(channel.put(&src, &remote(&dst)).await.unwrap(), 1500);
        assert_eq!(std::fs::read(&dst).unwrap(), vec![1u8; 1500]);
    }

    #[tokio::test]
    async fn put_distinguishes_local_and_remote_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let channel = LoopbackChannel::new();
        let missing_src = tmp.path().join("missing");
        let err = channel
            .put(&missing_src, &remote(&tmp.path().join("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Local(_)));
        let src = tmp.path().join("src");
        std::fs::write(&src, "x").unwrap();
        let err = channel
            .put(&src, &remote(&tmp.path().join("no").join("parent")))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotFound(_)));
    }

    #[tokio::test]
    async fn mkdir_and_stat() {
        let tmp = tempfile::tempdir().unwrap();
        let channel = LoopbackChannel::new();
        let dir = remote(&tmp.path().join("d"));
        assert!(matches!(
            channel.stat(&dir).await.unwrap_err(),
            ChannelError::NotFound(_)
        ));
        channel.mkdir(&dir).await.unwrap();
        assert!(channel.stat(&dir).await.unwrap().is_dir);
        assert!(matches!(
            channel.mkdir(&dir).await.unwrap_err(),
            ChannelError::AlreadyExists(_)
        ));
    }

    #[tokio::test]
    async fn mkdir_over_a_file_is_not_already_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("f");
        std::fs::write(&file, "x").unwrap();
        let channel = LoopbackChannel::new();
        assert!(matches!(
            channel.mkdir(&remote(&file)).await.unwrap_err(),
            ChannelError::NotADirectory(_)
        ));
    }

    #[tokio::test]
    async fn exec_reports_exit_status() {
        let channel = LoopbackChannel::new();
        let output = channel.exec("echo out; echo err >&2; exit 3").await.unwrap();
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.diagnostic(), "err");
    }

    #[tokio::test]
    async fn closed_channel_rejects_operations() {
        let channel = LoopbackConnector.connect().await.unwrap();
        channel.close().await.unwrap();
        assert!(matches!(
            channel.exec("true").await.unwrap_err(),
            ChannelError::Closed
        ));
        assert!(matches!(
            channel.close().await.unwrap_err(),
            ChannelError::Closed
        ));
    }
}
