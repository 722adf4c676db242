use remote::{
    Channel, ChannelError, CommandOutput, CreatedDirs, Dialect, RemoteDirs, RemoteMetadata,
};

/// Loopback channel that counts the calls made through it
#[derive(Default)]
struct CountingChannel {
    inner: remote::LoopbackChannel,
    stats: std::sync::atomic::AtomicUsize,
    mkdirs: std::sync::atomic::AtomicUsize,
    execs: std::sync::Mutex<Vec<String>>,
    /// Report every path as missing, as if it vanished between stat and mkdir
    blind_stat: bool,
}

impl CountingChannel {
    fn mkdirs(&self) -> usize {
        self.mkdirs.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn stats(&self) -> usize {
        self.stats.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Channel for CountingChannel {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    async fn put(
        &self,
        local_path: &std::path::Path,
        remote_path: &str,
    ) -> Result<u64, ChannelError> {
        self.inner.put(local_path, remote_path).await
    }

    async fn exec(&self, command: &str) -> Result<CommandOutput, ChannelError> {
        self.execs.lock().unwrap().push(command.to_string());
        self.inner.exec(command).await
    }

    async fn stat(&self, remote_path: &str) -> Result<RemoteMetadata, ChannelError> {
        self.stats.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.blind_stat {
            return Err(ChannelError::NotFound(remote_path.to_string()));
        }
        self.inner.stat(remote_path).await
    }

    async fn mkdir(&self, remote_path: &str) -> Result<(), ChannelError> {
        self.mkdirs.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.inner.mkdir(remote_path).await
    }

    async fn close(&self) -> Result<(), ChannelError> {
        self.inner.close().await
    }
}

fn remote_path(path: &std::path::Path) -> String {
    path.to_str().unwrap().to_string()
}

#[tokio::test]
async fn ensure_dir_creates_missing_ancestors() {
    let tmp = tempfile::tempdir().unwrap();
    let channel = CountingChannel::default();
    let dirs = RemoteDirs::new(&channel);
    let target = tmp.path().join("a").join("b").join("c");
    dirs.ensure_dir(&remote_path(&target)).await.unwrap();
    assert!(target.is_dir());
    assert_eq!(channel.mkdirs(), 3);
    // existing directory needs no mkdir
    dirs.ensure_dir(&remote_path(&target)).await.unwrap();
    assert_eq!(channel.mkdirs(), 3);
}

#[tokio::test]
async fn cached_ensure_dir_skips_known_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let channel = CountingChannel::default();
    let dirs = RemoteDirs::new(&channel);
    let root = remote_path(tmp.path());
    let mut created = CreatedDirs::new();
    created.insert(&root);
    for name in ["x/1", "x/2", "x/3"] {
        let dir = remote::path::join(&root, name);
        dirs.ensure_dir_cached(&dir, &mut created).await.unwrap();
    }
    // x once plus three leaves
    assert_eq!(channel.mkdirs(), 4);
    let stats_before = channel.stats();
    dirs.ensure_dir_cached(&remote::path::join(&root, "x/2"), &mut created)
        .await
        .unwrap();
    assert_eq!(channel.stats(), stats_before);
    assert_eq!(channel.mkdirs(), 4);
    assert!(created.contains(&remote::path::join(&root, "x")));
    assert_eq!(created.len(), 5);
}

#[tokio::test]
async fn directory_created_elsewhere_is_not_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmp.path().join("raced")).unwrap();
    let channel = CountingChannel {
        blind_stat: true,
        ..Default::default()
    };
    let dirs = RemoteDirs::new(&channel);
    let root = remote_path(tmp.path());
    let target = remote::path::join(&root, "raced");
    let mut created = CreatedDirs::new();
    created.insert(&root);
    dirs.ensure_dir_cached(&target, &mut created).await.unwrap();
    assert_eq!(channel.mkdirs(), 1);
    assert!(created.contains(&target));
}

#[tokio::test]
async fn ensure_dir_under_a_file_fails() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("file"), "x").unwrap();
    let channel = CountingChannel::default();
    let dirs = RemoteDirs::new(&channel);
    let target = remote_path(&tmp.path().join("file").join("sub"));
    assert!(dirs.ensure_dir(&target).await.is_err());
}

#[tokio::test]
async fn ensure_dir_on_a_file_fails_without_caching() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("file");
    std::fs::write(&file, "x").unwrap();
    let channel = CountingChannel::default();
    let dirs = RemoteDirs::new(&channel);
    let target = remote_path(&file);
    let mut created = CreatedDirs::new();
    let err = dirs
        .ensure_dir_cached(&target, &mut created)
        .await
        .unwrap_err();
    assert!(matches!(err, ChannelError::NotADirectory(_)));
    assert!(!created.contains(&target));
    assert_eq!(channel.mkdirs(), 0);
    assert!(file.is_file());
    // plain existence check still sees the file
    assert!(dirs.exists(&target).await);
}

#[tokio::test]
async fn exists_reports_presence() {
    let tmp = tempfile::tempdir().unwrap();
    let channel = CountingChannel::default();
    let dirs = RemoteDirs::new(&channel);
    assert!(dirs.exists(&remote_path(tmp.path())).await);
    assert!(!dirs.exists(&remote_path(&tmp.path().join("missing"))).await);
}

#[tokio::test]
async fn prepare_root_leaves_an_empty_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("upload");
    std::fs::create_dir_all(root.join("stale").join("deep")).unwrap();
    std::fs::write(root.join("stale").join("deep").join("old.txt"), "old").unwrap();
    let channel = CountingChannel::default();
    let dirs = RemoteDirs::new(&channel);
    dirs.prepare_root(&remote_path(&root)).await.unwrap();
    assert!(root.is_dir());
    assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    assert_eq!(
        channel.execs.lock().unwrap().first().unwrap(),
        &format!("rm -rf '{}'", remote_path(&root))
    );
}

#[tokio::test]
async fn prepare_root_creates_missing_root() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("new").join("upload");
    let channel = CountingChannel::default();
    RemoteDirs::new(&channel)
        .prepare_root(&remote_path(&root))
        .await
        .unwrap();
    assert!(root.is_dir());
}

#[tokio::test]
async fn clear_dir_of_missing_directory_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let channel = CountingChannel::default();
    RemoteDirs::new(&channel)
        .clear_dir(&remote_path(&tmp.path().join("missing")))
        .await
        .unwrap();
}

#[tokio::test]
async fn extract_failure_carries_status_and_diagnostic() {
    let tmp = tempfile::tempdir().unwrap();
    let bogus = tmp.path().join("bogus.tar.gz");
    std::fs::write(&bogus, "not an archive").unwrap();
    let channel = CountingChannel::default();
    let err = RemoteDirs::new(&channel)
        .extract_archive(&remote_path(&bogus), &remote_path(tmp.path()))
        .await
        .unwrap_err();
    match err {
        ChannelError::Command { status, diagnostic } => {
            assert_ne!(status, Some(0));
            assert!(!diagnostic.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn remove_file_tolerates_missing_file() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("x.tar.gz");
    std::fs::write(&file, "x").unwrap();
    let channel = CountingChannel::default();
    let dirs = RemoteDirs::new(&channel);
    dirs.remove_file(&remote_path(&file)).await.unwrap();
    assert!(!file.exists());
    dirs.remove_file(&remote_path(&file)).await.unwrap();
}
