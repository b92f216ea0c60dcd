use std::io::Write;
use std::path::Path;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicWriteOptions {
    pub sync: bool,
}

impl AtomicWriteOptions {
    pub fn new() -> Self { Self::default() }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

/// Write `content` to `path` so that readers observe either the old file or the new one,
/// never a prefix of it.
pub fn atomic_write(
    path: impl AsRef<Path>,
    content: &[u8],
    options: AtomicWriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    let parent = path
        .parent()
        .ok_or_else(|| Error::NoParent(path.to_path_buf()))?;
    crate::ensure_dir(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp.")
        .suffix(".filament")
        .tempfile_in(parent)
        .map_err(|source| Error::Write {
            path: parent.to_path_buf(),
            source,
        })?;

    tmp.write_all(content).map_err(|source| Error::Write {
        path: tmp.path().to_path_buf(),
        source,
    })?;

    if options.sync {
        tmp.as_file().sync_all().map_err(|source| Error::Write {
            path: tmp.path().to_path_buf(),
            source,
        })?;
    }

    // `persist` removes the temporary file itself when the rename fails.
    tmp.persist(path).map_err(|e| Error::Rename {
        from:   e.file.path().to_path_buf(),
        to:     path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");
        atomic_write(&path, b"hello world", AtomicWriteOptions::new()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn test_atomic_write_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/c.bin");
        atomic_write(&path, b"nested", AtomicWriteOptions::new().sync(true)).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"nested");
    }

    #[test]
    fn test_atomic_write_leaves_no_temporaries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("only.txt");
        atomic_write(&path, b"one", AtomicWriteOptions::new()).unwrap();
        atomic_write(&path, b"two", AtomicWriteOptions::new()).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("only.txt")]);
        assert_eq!(fs::read(&path).unwrap(), b"two");
    }

    #[test]
    fn test_atomic_write_under_a_file_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let err = atomic_write(blocker.join("child.txt"), b"x", AtomicWriteOptions::new()).unwrap_err();
        assert!(matches!(err, Error::CreateDir { .. }));
        assert_eq!(err.path(), blocker.as_path());
        assert!(err.io().is_some());
    }
}
