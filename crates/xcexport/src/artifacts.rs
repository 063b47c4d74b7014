//! Artifact copying and packaging.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::info;
use xcexport_common::{Error, Result};

pub fn remove_if_exists(path: &Path) -> Result<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Recursively copy a directory (an `.app` bundle, a dSYM).
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Package a directory as a gzip tarball, rooted at the directory's name.
pub fn export_targz(src_dir: &Path, dest: &Path) -> Result<()> {
    let root = src_dir
        .file_name()
        .ok_or_else(|| Error::Other(format!("cannot package {}", src_dir.display())))?
        .to_string_lossy()
        .to_string();

    let file = File::create(dest)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut archive = Builder::new(encoder);
    archive.append_dir_all(&root, src_dir)?;
    archive.into_inner()?.finish()?;

    info!("packaged {} -> {}", src_dir.display(), dest.display());
    Ok(())
}

/// Directory entries with the given extension, sorted for determinism.
pub fn find_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut matches: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == extension)
                .unwrap_or(false)
        })
        .collect();
    matches.sort();
    Ok(matches)
}
