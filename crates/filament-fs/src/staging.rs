use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::{Error, Result};

/// A file being filled in under a staging directory.
///
/// The file is created empty by [`StagedFile::new_in`]. Writers open [`StagedFile::path`]
/// themselves (sync or async). [`StagedFile::commit`] renames it into place; dropping the
/// guard before that removes it.
pub struct StagedFile {
    path: TempPath,
}

impl StagedFile {
    pub fn new_in(staging_dir: impl AsRef<Path>) -> Result<Self> {
        let staging_dir = staging_dir.as_ref();
        crate::ensure_dir(staging_dir)?;

        let file = tempfile::Builder::new()
            .prefix(".stage.")
            .suffix(".part")
            .tempfile_in(staging_dir)
            .map_err(|source| Error::Write {
                path: staging_dir.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Move the staged file to `destination`, replacing any file already there.
    pub fn commit(self, destination: impl AsRef<Path>) -> Result<PathBuf> {
        let destination = destination.as_ref();
        let parent = destination
            .parent()
            .ok_or_else(|| Error::NoParent(destination.to_path_buf()))?;
        crate::ensure_dir(parent)?;

        let from = self.path.to_path_buf();
        self.path.persist(destination).map_err(|e| Error::Rename {
            from,
            to: destination.to_path_buf(),
            source: e.error,
        })?;

        tracing::trace!(path = %destination.display(), "staged file committed");
        Ok(destination.to_path_buf())
    }
}

/// Remove every entry left in a staging directory by a previous, interrupted process.
///
/// Returns how many entries were removed. A missing directory counts as empty.
pub fn sweep_dir(dir: impl AsRef<Path>) -> Result<usize> {
    let dir = dir.as_ref();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(Error::Read {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|source| Error::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        result.map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;
        removed += 1;
    }
    Ok(removed)
}
