use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

/// Replace `path` with `bytes` through a sibling temp file and a rename, so
/// readers never observe a partially written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let wrap = |source: std::io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(wrap)?;
    tmp.write_all(bytes).map_err(wrap)?;
    tmp.flush().map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;

    debug!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xml");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        // no stray temp files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomic_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.xml");

        match write_atomic(&path, b"x") {
            Err(err @ Error::Write { .. }) => {
                assert!(err.to_string().contains("out.xml"), "{}", err);
            }
            other => panic!("expected a write error, got {:?}", other),
        }
    }
}
