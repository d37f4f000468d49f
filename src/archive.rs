//! Archiving of a build's previous output before it is regenerated.

use log::debug;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::Builder as TarBuilder;
use walkdir::WalkDir;

use crate::constants::ARCHIVE_EXTENSION;
use crate::error::{PacksmithError, PacksmithResult};

/// Preserves the contents of an output directory.
pub trait Archiver {
    /// Archives `dir` and empties it.
    ///
    /// # Returns
    /// * `Ok(None)` when there was nothing to archive
    /// * `Ok(Some(path))` with the archive's location
    fn archive(&self, dir: &Path) -> PacksmithResult<Option<PathBuf>>;
}

/// Writes `<dir>-<date>.tar.zst` next to the archived directory.
pub struct TarArchiver {
    level: i32,
    date: String,
}

impl TarArchiver {
    pub fn new() -> Self {
        Self {
            level: 3,
            date: chrono::Local::now().format("%Y-%m-%d").to_string(),
        }
    }
}

impl Default for TarArchiver {
    fn default() -> Self {
        TarArchiver::new()
    }
}

impl Archiver for TarArchiver {
    fn archive(&self, dir: &Path) -> PacksmithResult<Option<PathBuf>> {
        if !dir.is_dir() {
            return Ok(None);
        }

        let mut entries: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| PacksmithError::ArchiveError(e.to_string()))?;
            entries.push(entry.path().to_path_buf());
        }
        if entries.is_empty() {
            debug!("{} is empty, nothing to archive", dir.display());
            return Ok(None);
        }
        entries.sort();

        let target = self.unique_target(dir)?;
        debug!("Archiving {} to {}", dir.display(), target.display());
        let out = File::create(&target)?;
        let encoder = zstd::stream::Encoder::new(out, self.level)?;
        let mut builder = TarBuilder::new(encoder);

        for path in &entries {
            let rel = path
                .strip_prefix(dir)
                .map_err(|e| PacksmithError::ArchiveError(e.to_string()))?;
            let metadata = fs::symlink_metadata(path)?;
            if metadata.is_dir() {
                builder.append_dir(rel, path)?;
            } else if metadata.is_file() {
                builder.append_path_with_name(path, rel)?;
            } else {
                debug!("Skipping special file {}", path.display());
            }
        }

        let encoder = builder.into_inner()?;
        encoder.finish()?;

        clear_dir(dir)?;
        Ok(Some(target))
    }
}

impl TarArchiver {
    /// First free `<dir>-<date>[-N].tar.zst` beside `dir`.
    fn unique_target(&self, dir: &Path) -> PacksmithResult<PathBuf> {
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PacksmithError::ArchiveError(format!("cannot archive '{}'", dir.display()))
            })?;
        let parent = dir.parent().unwrap_or_else(|| Path::new(""));

        let mut candidate = parent.join(format!("{}-{}.{}", name, self.date, ARCHIVE_EXTENSION));
        let mut n = 1;
        while candidate.exists() {
            candidate = parent.join(format!(
                "{}-{}-{}.{}",
                name, self.date, n, ARCHIVE_EXTENSION
            ));
            n += 1;
        }
        Ok(candidate)
    }
}

fn clear_dir(dir: &Path) -> PacksmithResult<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if fs::symlink_metadata(&path)?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
