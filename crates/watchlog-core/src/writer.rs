use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    Written,
    Unchanged,
    DryRun,
}

impl NoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteStatus::Written => "written",
            NoteStatus::Unchanged => "unchanged",
            NoteStatus::DryRun => "dry run",
        }
    }
}

/// Replaces the note file with rendered content.
///
/// The content goes to a sibling temp file first and is renamed into place,
/// so readers never see a half-written note.
pub struct NoteWriter {
    path: PathBuf,
}

impl NoteWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn write(&self, content: &str) -> std::io::Result<NoteStatus> {
        if let Ok(existing) = tokio::fs::read_to_string(&self.path).await {
            if existing == content {
                debug!("Note at {:?} is unchanged, skipping write", self.path);
                return Ok(NoteStatus::Unchanged);
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, content).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }
        debug!("Wrote {} bytes to {:?}", content.len(), self.path);
        Ok(NoteStatus::Written)
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "note.md".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_creates_then_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes").join("Trakt History.md");
        let writer = NoteWriter::new(path.clone());

        assert_eq!(writer.write("first").await.unwrap(), NoteStatus::Written);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");

        assert_eq!(writer.write("second").await.unwrap(), NoteStatus::Written);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.path().join("notes").join(".Trakt History.md.tmp").exists());
    }

    #[tokio::test]
    async fn test_identical_content_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Trakt History.md");
        let writer = NoteWriter::new(path.clone());

        writer.write("same").await.unwrap();
        assert_eq!(writer.write("same").await.unwrap(), NoteStatus::Unchanged);
    }

    #[tokio::test]
    async fn test_write_into_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        // A regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let writer = NoteWriter::new(blocker.join("note.md"));

        assert!(writer.write("content").await.is_err());
    }
}
