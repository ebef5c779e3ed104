//! File sink: overwrite a JSON document on every update.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::PublishError;

/// Writes each frame to a fixed path, atomically where the platform allows:
/// the frame lands in a temporary file in the target directory and is
/// renamed over the destination, so a concurrent reader never sees a
/// half-written document.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, payload: &str) -> Result<(), PublishError> {
        self.write_inner(payload).map_err(|source| PublishError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn write_inner(&self, payload: &str) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(payload.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn overwrites_the_target_on_every_write() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("TotalState.json");
        let sink = FileSink::new(&target);

        sink.write(r#"{"characters":[]}"#).unwrap();
        sink.write(r#"{"characters":[1]}"#).unwrap();

        let contents = std::fs::read_to_string(&target).unwrap();
        assert_eq!(contents, r#"{"characters":[1]}"#);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested/out/TotalState.json");

        FileSink::new(&target).write("{}").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{}");
    }
}
