//! Zip packaging of a job's staged icons.
//!
//! Blocking I/O. Callers on the async runtime should go through
//! `tokio::task::spawn_blocking`.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl ArchiveError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
        move |source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Zip every regular file under `source_dir` into `dest`.
///
/// Entry names are paths relative to `source_dir` with `/` separators.
/// Symlinks and other special files are skipped. Returns `dest`.
pub fn archive_directory(source_dir: &Path, dest: &Path) -> Result<PathBuf, ArchiveError> {
    let mut files = Vec::new();
    collect_files(source_dir, &mut files)?;
    files.sort();

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(ArchiveError::io(parent))?;
    }
    let out = File::create(dest).map_err(ArchiveError::io(dest))?;

    let result = write_entries(out, source_dir, &files);
    if result.is_err() {
        let _ = fs::remove_file(dest);
    }
    result?;

    debug!(
        source = %source_dir.display(),
        archive = %dest.display(),
        entries = files.len(),
        "Archived directory"
    );
    Ok(dest.to_path_buf())
}

fn write_entries(out: File, root: &Path, files: &[PathBuf]) -> Result<(), ArchiveError> {
    let mut writer = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        writer.start_file(entry_name(root, path), options)?;
        let bytes = fs::read(path).map_err(ArchiveError::io(path))?;
        writer.write_all(&bytes).map_err(ArchiveError::io(path))?;
    }

    writer.finish()?;
    Ok(())
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), ArchiveError> {
    for entry in fs::read_dir(dir).map_err(ArchiveError::io(dir))? {
        let entry = entry.map_err(ArchiveError::io(dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(ArchiveError::io(&path))?;

        if file_type.is_dir() {
            collect_files(&path, files)?;
        } else if file_type.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

fn entry_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Entry names of an existing archive, in archive order.
pub fn list_entries(archive: &Path) -> Result<Vec<String>, ArchiveError> {
    let file = File::open(archive).map_err(ArchiveError::io(archive))?;
    let zip = ZipArchive::new(file)?;
    Ok(zip.file_names().map(str::to_string).collect())
}
