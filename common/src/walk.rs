//! Local tree walk shared by the archiver and the mirror strategy

use crate::error::Error;

/// A regular file found under the local root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub local_path: std::path::PathBuf,
    /// Path relative to the walked root, always '/'-separated since it is sent to a remote host
    pub relative_path: String,
    pub size_bytes: u64,
}

/// File count and total size of a local input
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct TreeStats {
    pub files: u64,
    pub bytes: u64,
}

impl TreeStats {
    pub fn of(entries: &[FileEntry]) -> Self {
        entries.iter().fold(Self::default(), |stats, entry| Self {
            files: stats.files + 1,
            bytes: stats.bytes + entry.size_bytes,
        })
    }
}

impl std::fmt::Display for TreeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} files, {}",
            self.files,
            bytesize::ByteSize(self.bytes)
        )
    }
}

/// Join the components of `path` below `root` with '/'
///
/// Returns an error for paths outside of `root` and for names that are not valid UTF-8, neither of
/// which can be expressed as a remote path.
pub fn relative_remote_path(
    root: &std::path::Path,
    path: &std::path::Path,
) -> Result<String, Error> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| Error::local_io(path, format!("not below {}", root.display())))?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            std::path::Component::Normal(name) => parts.push(
                name.to_str()
                    .ok_or_else(|| Error::local_io(path, "file name is not valid UTF-8"))?,
            ),
            std::path::Component::CurDir => {}
            _ => {
                return Err(Error::local_io(path, "unexpected path component"));
            }
        }
    }
    Ok(parts.join("/"))
}

fn single_file(path: &std::path::Path, size_bytes: u64) -> Result<FileEntry, Error> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::local_io(path, "file name is not valid UTF-8"))?;
    Ok(FileEntry {
        local_path: path.to_path_buf(),
        relative_path: name.to_string(),
        size_bytes,
    })
}

/// List every regular file under `root`, ordered by path
///
/// When `root` is itself a file the result holds exactly that file, named by its base name.
/// Symlinks are not followed and are not listed.
pub fn walk(root: &std::path::Path) -> Result<Vec<FileEntry>, Error> {
    let metadata = std::fs::metadata(root).map_err(|err| Error::local_io(root, err))?;
    if metadata.is_file() {
        return Ok(vec![single_file(root, metadata.len())?]);
    }
    let mut entries = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let size_bytes = entry
            .metadata()
            .map_err(|err| Error::local_io(entry.path(), err))?
            .len();
        entries.push(FileEntry {
            local_path: entry.path().to_path_buf(),
            relative_path: relative_remote_path(root, entry.path())?,
            size_bytes,
        });
    }
    tracing::debug!("walk: {:?} has {} files", root, entries.len());
    Ok(entries)
}

/// Same as [`walk`] but runs on the blocking pool
pub async fn scan(root: &std::path::Path) -> Result<Vec<FileEntry>, Error> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || walk(&root))
        .await
        .map_err(|err| Error::LocalIo(format!("tree walk task failed: {err}")))?
}
