//! Remote directory management
//!
//! Both strategies prepare the remote root the same way: delete it, then create it again with any
//! missing ancestors. The mirror strategy additionally creates the parent directory of every file
//! it uploads and memoizes what it created so each directory costs one round trip at most.

use crate::channel::{Channel, ChannelError, RemoteMetadata};
use crate::path;

/// Remote directories known to exist during one strategy run
#[derive(Debug, Default, Clone)]
pub struct CreatedDirs {
    dirs: std::collections::HashSet<String>,
}

impl CreatedDirs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, dir: &str) -> bool {
        self.dirs.contains(&path::normalize(dir))
    }

    pub fn insert(&mut self, dir: &str) {
        self.dirs.insert(path::normalize(dir));
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

pub struct RemoteDirs<'a> {
    channel: &'a dyn Channel,
}

impl<'a> RemoteDirs<'a> {
    pub fn new(channel: &'a dyn Channel) -> Self {
        Self { channel }
    }

    /// Run a single remote command, failing on a non-zero exit
    async fn run(&self, command: &str) -> Result<(), ChannelError> {
        let output = self.channel.exec(command).await?;
        if !output.success() {
            return Err(ChannelError::Command {
                status: output.status,
                diagnostic: output.diagnostic(),
            });
        }
        Ok(())
    }

    /// Whether `dir` exists; errors are treated as absence
    pub async fn exists(&self, dir: &str) -> bool {
        match self.channel.stat(dir).await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!("stat {:?}: {}", dir, error);
                false
            }
        }
    }

    /// Create `dir` and every missing ancestor
    pub async fn ensure_dir(&self, dir: &str) -> Result<(), ChannelError> {
        let mut created = CreatedDirs::new();
        self.ensure_dir_cached(dir, &mut created).await
    }

    /// Create `dir` and every missing ancestor, skipping directories already in `created`
    ///
    /// Missing directories are created outermost first. A directory that appears concurrently is
    /// not an error, an existing non-directory anywhere on the way is. Every directory found or
    /// created is added to `created`.
    pub async fn ensure_dir_cached(
        &self,
        dir: &str,
        created: &mut CreatedDirs,
    ) -> Result<(), ChannelError> {
        let dir = path::normalize(dir);
        let mut missing = Vec::new();
        let mut current = Some(dir.clone());
        while let Some(candidate) = current {
            if path::is_root(&candidate) || created.contains(&candidate) {
                break;
            }
            match self.channel.stat(&candidate).await {
                Ok(RemoteMetadata { is_dir: true }) => {
                    created.insert(&candidate);
                    break;
                }
                Ok(RemoteMetadata { is_dir: false }) => {
                    return Err(ChannelError::NotADirectory(candidate));
                }
                Err(error) => tracing::debug!("stat {:?}: {}", candidate, error),
            }
            current = path::parent(&candidate);
            missing.push(candidate);
        }
        for candidate in missing.iter().rev() {
            match self.channel.mkdir(candidate).await {
                Ok(()) => tracing::debug!("created remote directory {:?}", candidate),
                Err(ChannelError::AlreadyExists(_)) => {
                    tracing::debug!("remote directory {:?} already exists", candidate)
                }
                Err(error) => return Err(error),
            }
            created.insert(candidate);
        }
        Ok(())
    }

    /// Recursively delete `dir`; succeeds if it did not exist
    pub async fn clear_dir(&self, dir: &str) -> Result<(), ChannelError> {
        self.run(&self.channel.dialect().remove_tree(dir)).await
    }

    /// Delete a single file; a missing file is not an error
    pub async fn remove_file(&self, file: &str) -> Result<(), ChannelError> {
        self.run(&self.channel.dialect().remove_file(file)).await
    }

    /// Unpack `archive` into `destination` on the remote host
    pub async fn extract_archive(
        &self,
        archive: &str,
        destination: &str,
    ) -> Result<(), ChannelError> {
        self.run(&self.channel.dialect().extract(archive, destination))
            .await
    }

    /// Start from an empty `root`
    ///
    /// A failed clear is logged and tolerated; the directory must exist afterwards though.
    pub async fn prepare_root(&self, root: &str) -> Result<(), ChannelError> {
        if let Err(error) = self.clear_dir(root).await {
            tracing::warn!("failed to clear remote directory {:?}: {}", root, error);
        }
        self.ensure_dir(root).await
    }
}
