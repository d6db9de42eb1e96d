//! Output staging.
//!
//! The trimmers never write to the requested output path directly. They write
//! into a temporary directory and the staged file is moved into place only
//! when the whole operation succeeded, so a failed or interrupted trim never
//! leaves a partial file at the output path.

use crate::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A staged output file with atomic finalization.
#[derive(Debug)]
pub(crate) struct OutputStage {
    temp_dir: TempDir,
    staged_path: PathBuf,
    final_path: PathBuf,
}

impl OutputStage {
    /// Create a staging area for the given final output path.
    ///
    /// Missing parent directories are created here, and the staging
    /// directory lives next to the destination so the final rename never
    /// crosses a filesystem boundary.
    pub fn new(final_path: &Path) -> Result<Self> {
        let file_name = final_path.file_name().ok_or_else(|| {
            crate::Error::invalid_arguments(format!(
                "output path has no file name: {:?}",
                final_path
            ))
        })?;

        let parent = match final_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let temp_dir = TempDir::new_in(parent)?;
        let staged_path = temp_dir.path().join(file_name);

        Ok(Self {
            temp_dir,
            staged_path,
            final_path: final_path.to_path_buf(),
        })
    }

    /// Path the trimmer should write to.
    pub fn staged(&self) -> &Path {
        &self.staged_path
    }

    /// Move the staged file to the final output path.
    ///
    /// Creates missing parent directories. A pre-existing file at the
    /// destination is replaced: it is renamed aside first and restored if the
    /// move fails, so the destination is never left half-written.
    pub fn finalize(self) -> Result<PathBuf> {
        if let Some(parent) = self.final_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        if self.final_path.exists() {
            // Appended suffix, so the backup never collides with an
            // unrelated `.bak` sibling.
            let backup = {
                let mut name = self.final_path.clone().into_os_string();
                name.push(".bak");
                PathBuf::from(name)
            };
            std::fs::rename(&self.final_path, &backup)?;

            if let Err(e) = std::fs::rename(&self.staged_path, &self.final_path) {
                let _ = std::fs::rename(&backup, &self.final_path);
                return Err(e.into());
            }

            let _ = std::fs::remove_file(&backup);
        } else {
            std::fs::rename(&self.staged_path, &self.final_path)?;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Finalized output at {:?}", self.final_path);

        Ok(self.final_path)
    }

    /// Drop the staged output without touching the final path.
    pub fn discard(self) {
        drop(self.temp_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_beside_the_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.m4a");

        let stage = OutputStage::new(&dest).unwrap();
        assert_eq!(stage.staged().file_name().unwrap(), "out.m4a");
        assert!(stage.staged().starts_with(stage.temp_dir.path()));
        // Same filesystem as the destination, so finalize is a plain rename.
        assert!(stage.staged().starts_with(dir.path()));
        assert_ne!(stage.staged(), dest);
    }

    #[test]
    fn test_finalize_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a/b/out.m4a");

        let stage = OutputStage::new(&dest).unwrap();
        std::fs::write(stage.staged(), b"trimmed").unwrap();

        let finalized = stage.finalize().unwrap();
        assert_eq!(finalized, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"trimmed");
    }

    #[test]
    fn test_finalize_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.m4a");
        std::fs::write(&dest, b"old").unwrap();

        let stage = OutputStage::new(&dest).unwrap();
        std::fs::write(stage.staged(), b"new").unwrap();
        stage.finalize().unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
        assert!(!dir.path().join("out.m4a.bak").exists());
    }

    #[test]
    fn test_replacement_backup_spares_sibling_bak_files() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.m4a");
        let sibling = dir.path().join("clip.bak");
        std::fs::write(&sibling, b"keep").unwrap();
        std::fs::write(&dest, b"old").unwrap();

        let stage = OutputStage::new(&dest).unwrap();
        std::fs::write(stage.staged(), b"new").unwrap();
        stage.finalize().unwrap();

        assert_eq!(std::fs::read(&sibling).unwrap(), b"keep");
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
        assert!(!dir.path().join("clip.m4a.bak").exists());
    }

    #[test]
    fn test_discard_leaves_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.m4a");

        let stage = OutputStage::new(&dest).unwrap();
        std::fs::write(stage.staged(), b"partial").unwrap();
        stage.discard();

        assert!(!dest.exists());
    }

    #[test]
    fn test_output_path_without_file_name_is_rejected() {
        let err = OutputStage::new(Path::new("/")).unwrap_err();
        assert_eq!(err.kind(), "INVALID_ARGUMENTS");
    }
}
