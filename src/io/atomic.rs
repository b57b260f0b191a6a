use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut tmp = temp_beside(path)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Like [`atomic_write`], but fails with `AlreadyExists` instead of
/// replacing an existing file.
pub fn atomic_write_new(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut tmp = temp_beside(path)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist_noclobber(path).map_err(|e| e.error)?;
    Ok(())
}

fn temp_beside(path: &Path) -> io::Result<NamedTempFile> {
    let dir = path.parent().unwrap_or(Path::new("."));
    // Dot prefix keeps in-flight files out of partition listings
    tempfile::Builder::new().prefix(".tmp").tempfile_in(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_replaces() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.yaml");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
    }

    #[test]
    fn atomic_write_new_refuses_existing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.yaml");
        atomic_write_new(&path, b"one").unwrap();
        let err = atomic_write_new(&path, b"two").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&path).unwrap(), "one");
        // No stray temp files left behind
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }
}
