//! Archiver: packs a local file or tree into a single gzip-compressed tarball
//!
//! Entry names are the '/'-separated paths produced by [`crate::walk::walk`], so the archive
//! extracts to the same relative layout on any remote host. Archives are always written under a
//! fresh name so concurrent runs never collide.

use std::io::Write;

use crate::error::Error;
use crate::walk::{self, FileEntry};

pub const ARCHIVE_PREFIX: &str = "xferbench_";
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// A freshly written archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub path: std::path::PathBuf,
    /// Number of regular files stored
    pub entries: u64,
    /// Total size of the stored files before compression
    pub source_bytes: u64,
    /// Size of the archive itself
    pub archive_bytes: u64,
}

impl ArchiveInfo {
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

fn create_unique(dir: &std::path::Path) -> Result<(std::path::PathBuf, std::fs::File), Error> {
    loop {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        let path = dir.join(format!(
            "{ARCHIVE_PREFIX}{millis}_{:08x}.{ARCHIVE_EXTENSION}",
            rand::random::<u32>()
        ));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => return Ok((path, file)),
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(Error::local_io(&path, error)),
        }
    }
}

fn write_archive(file: std::fs::File, entries: &[FileEntry]) -> Result<(), Error> {
    let encoder = flate2::write::GzEncoder::new(
        std::io::BufWriter::new(file),
        flate2::Compression::default(),
    );
    let mut builder = tar::Builder::new(encoder);
    for entry in entries {
        let mut reader = std::fs::File::open(&entry.local_path)
            .map_err(|err| Error::local_io(&entry.local_path, err))?;
        builder
            .append_file(&entry.relative_path, &mut reader)
            .map_err(|err| Error::local_io(&entry.local_path, err))?;
    }
    let encoder = builder.into_inner()?;
    let mut writer = encoder.finish()?;
    writer.flush()?;
    Ok(())
}

/// Archive `source` into `staging_dir` (or the system temp directory)
///
/// A file source yields an archive with one entry named by the file's base name; a directory
/// source yields one entry per regular file below it. `source` is never modified. On failure no
/// archive is left behind.
pub fn archive(
    source: &std::path::Path,
    staging_dir: Option<&std::path::Path>,
) -> Result<ArchiveInfo, Error> {
    let entries = walk::walk(source)?;
    let dir = staging_dir
        .map(std::path::Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir);
    let (path, file) = create_unique(&dir)?;
    tracing::debug!("archive: {:?} -> {:?}", source, path);
    let written = write_archive(file, &entries).and_then(|()| {
        std::fs::metadata(&path)
            .map(|metadata| metadata.len())
            .map_err(|err| Error::local_io(&path, err))
    });
    match written {
        Ok(archive_bytes) => {
            let stats = walk::TreeStats::of(&entries);
            Ok(ArchiveInfo {
                path,
                entries: stats.files,
                source_bytes: stats.bytes,
                archive_bytes,
            })
        }
        Err(error) => {
            if let Err(rm_error) = std::fs::remove_file(&path) {
                tracing::warn!("failed removing partial archive {:?}: {}", path, rm_error);
            }
            Err(error)
        }
    }
}

/// Same as [`archive`] but runs on the blocking pool
pub async fn archive_async(
    source: std::path::PathBuf,
    staging_dir: Option<std::path::PathBuf>,
) -> Result<ArchiveInfo, Error> {
    tokio::task::spawn_blocking(move || archive(&source, staging_dir.as_deref()))
        .await
        .map_err(|err| Error::LocalIo(format!("archive task failed: {err}")))?
}

/// Names of the regular-file entries stored in an archive, in archive order
pub fn list_entries(archive: &std::path::Path) -> Result<Vec<String>, Error> {
    let file = std::fs::File::open(archive).map_err(|err| Error::local_io(archive, err))?;
    let mut reader = tar::Archive::new(flate2::read::GzDecoder::new(std::io::BufReader::new(
        file,
    )));
    let mut names = Vec::new();
    for entry in reader
        .entries()
        .map_err(|err| Error::local_io(archive, err))?
    {
        let entry = entry.map_err(|err| Error::local_io(archive, err))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .map_err(|err| Error::local_io(archive, err))?
            .to_string_lossy()
            .replace('\\', "/");
        names.push(name);
    }
    Ok(names)
}
