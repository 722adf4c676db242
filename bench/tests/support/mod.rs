//! Test helpers: scripted channels layered over the loopback channel and tree fixtures.

#![allow(dead_code)]

use remote::{Channel, ChannelError, CommandOutput, Connector, Dialect, RemoteMetadata};

/// Failures and side effects injected into a loopback channel
#[derive(Clone, Default)]
pub struct Script {
    /// Uploads whose remote path ends with this suffix fail
    pub fail_put_suffix: Option<String>,
    /// Commands containing this text exit with status 1
    pub fail_exec_containing: Option<String>,
    /// Cancel the token once this many uploads went through
    pub cancel_after_puts: Option<(usize, tokio_util::sync::CancellationToken)>,
}

pub type CallLog = std::sync::Arc<std::sync::Mutex<Vec<String>>>;

pub struct ScriptedChannel {
    inner: Box<dyn Channel>,
    script: Script,
    calls: CallLog,
    puts: std::sync::atomic::AtomicUsize,
}

impl ScriptedChannel {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl Channel for ScriptedChannel {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    async fn put(
        &self,
        local_path: &std::path::Path,
        remote_path: &str,
    ) -> Result<u64, ChannelError> {
        self.record(format!("put {remote_path}"));
        let fail = self.script.fail_put_suffix.as_deref();
        if fail.is_some_and(|suffix| remote_path.ends_with(suffix)) {
            return Err(ChannelError::Io("injected upload failure".to_string()));
        }
        let result = self.inner.put(local_path, remote_path).await;
        let puts = self.puts.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        let cancel_after = self.script.cancel_after_puts.as_ref();
        if let Some((_, cancel)) = cancel_after.filter(|(limit, _)| puts >= *limit) {
            cancel.cancel();
        }
        result
    }

    async fn exec(&self, command: &str) -> Result<CommandOutput, ChannelError> {
        self.record(format!("exec {command}"));
        let fail = self.script.fail_exec_containing.as_deref();
        if fail.is_some_and(|needle| command.contains(needle)) {
            return Ok(CommandOutput {
                status: Some(1),
                stdout: String::new(),
                stderr: "injected command failure".to_string(),
            });
        }
        self.inner.exec(command).await
    }

    async fn stat(&self, remote_path: &str) -> Result<RemoteMetadata, ChannelError> {
        self.record(format!("stat {remote_path}"));
        self.inner.stat(remote_path).await
    }

    async fn mkdir(&self, remote_path: &str) -> Result<(), ChannelError> {
        self.record(format!("mkdir {remote_path}"));
        self.inner.mkdir(remote_path).await
    }

    async fn close(&self) -> Result<(), ChannelError> {
        self.record("close".to_string());
        self.inner.close().await
    }
}

/// Hands out scripted loopback channels that all log into one shared call log
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    pub script: Script,
    pub calls: CallLog,
    /// Number of channels handed out
    pub connects: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    pub fn channel(&self) -> ScriptedChannel {
        ScriptedChannel {
            inner: Box::new(remote::LoopbackChannel::new()),
            script: self.script.clone(),
            calls: self.calls.clone(),
            puts: Default::default(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Connector for ScriptedConnector {
    fn describe(&self) -> String {
        "scripted loopback".to_string()
    }

    async fn connect(&self) -> Result<Box<dyn Channel>, ChannelError> {
        self.connects.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(Box::new(self.channel()))
    }
}

/// Rejects every connection attempt
pub struct FailingConnector;

#[async_trait::async_trait]
impl Connector for FailingConnector {
    fn describe(&self) -> String {
        "unreachable".to_string()
    }

    async fn connect(&self) -> Result<Box<dyn Channel>, ChannelError> {
        Err(ChannelError::Auth("permission denied (publickey)".to_string()))
    }
}

pub fn remote_path(path: &std::path::Path) -> String {
    path.to_str().unwrap().to_string()
}

/// Three files of 1KiB, 2KiB and 0 bytes under nested directories
///
/// ```text
/// src
/// |- top.bin
/// |- a
///    |- mid.bin
///    |- b
///       |- empty.bin
/// ```
pub fn setup_tree() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    std::fs::create_dir_all(src.join("a").join("b")).unwrap();
    std::fs::write(src.join("top.bin"), vec![1u8; 1024]).unwrap();
    std::fs::write(src.join("a").join("mid.bin"), vec![2u8; 2048]).unwrap();
    std::fs::write(src.join("a").join("b").join("empty.bin"), b"").unwrap();
    std::fs::create_dir(tmp.path().join("staging")).unwrap();
    tmp
}

/// Relative path to contents of every regular file under `root`
pub fn read_tree(root: &std::path::Path) -> std::collections::BTreeMap<String, Vec<u8>> {
    common::walk::walk(root)
        .unwrap()
        .into_iter()
        .map(|entry| {
            let contents = std::fs::read(&entry.local_path).unwrap();
            (entry.relative_path, contents)
        })
        .collect()
}

/// Number of entries in the staging directory
pub fn staged_files(tmp: &tempfile::TempDir) -> usize {
    std::fs::read_dir(tmp.path().join("staging")).unwrap().count()
}
