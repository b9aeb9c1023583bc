use crate::domain::models::archive::ArchiveEntry;
use crate::domain::ports::ArchiveWriter;
use anyhow::{Context, Error};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Writes archive entries below a root directory on disk.
#[derive(Debug, Clone)]
pub struct FsArchiveWriter {
    root: PathBuf,
}

impl FsArchiveWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArchiveWriter for FsArchiveWriter {
    async fn write(&self, entry: &ArchiveEntry) -> Result<(), Error> {
        let path = self.root.join(&entry.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, &entry.content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::trace!("Wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let root = tempfile::tempdir().unwrap();
        let writer = FsArchiveWriter::new(root.path());

        writer
            .write(&ArchiveEntry::new("repo_1/20250101-000000Z/runs/1.json", r#"{"id":1}"#))
            .await
            .unwrap();

        let written =
            std::fs::read_to_string(root.path().join("repo_1/20250101-000000Z/runs/1.json")).unwrap();
        assert_eq!(written, r#"{"id":1}"#);
    }
}
