//! Scoped working copies.
//!
//! A `WorkingCopy` owns `<workspace>/<task>` for the length of one deployment
//! step. Callers hand it back through [`WorkingCopy::remove`] when the step
//! finishes; if the future is dropped mid-await instead, `Drop` deletes the
//! directory as a last resort.

use std::path::{Path, PathBuf};

use crate::error::{io_err, VcsError};
use crate::types::{ArtifactFile, TaskId};

#[derive(Debug)]
pub struct WorkingCopy {
    root: PathBuf,
    removed: bool,
}

impl WorkingCopy {
    /// Claim the directory for `task`, destroying anything left over from an
    /// earlier attempt. The directory itself is not created; `git clone`
    /// wants to do that.
    pub async fn reserve(workspace: &Path, task: &TaskId) -> Result<Self, VcsError> {
        tokio::fs::create_dir_all(workspace)
            .await
            .map_err(|e| io_err(workspace, e))?;
        let root = workspace.join(task.as_str());
        remove_stale(&root).await?;
        Ok(Self {
            root,
            removed: false,
        })
    }

    /// Claim the directory for `task` and create it empty.
    pub async fn fresh(workspace: &Path, task: &TaskId) -> Result<Self, VcsError> {
        let copy = Self::reserve(workspace, task).await?;
        tokio::fs::create_dir_all(&copy.root)
            .await
            .map_err(|e| io_err(&copy.root, e))?;
        Ok(copy)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write a file relative to the working copy root.
    pub async fn write_file(&self, file: &ArtifactFile) -> Result<(), VcsError> {
        let full = self.root.join(&file.path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err(parent, e))?;
        }
        tokio::fs::write(&full, &file.contents)
            .await
            .map_err(|e| io_err(&full, e))?;
        tracing::debug!(path = %full.display(), bytes = file.contents.len(), "Wrote file");
        Ok(())
    }

    /// Delete the directory without blocking the runtime. A failure is
    /// logged and left to `Drop` to retry.
    pub async fn remove(mut self) {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                tracing::debug!(path = %self.root.display(), "Removed working copy");
                self.removed = true;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.removed = true,
            Err(e) => tracing::warn!(
                path = %self.root.display(),
                error = %e,
                "Failed to remove working copy"
            ),
        }
    }
}

impl Drop for WorkingCopy {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => tracing::debug!(path = %self.root.display(), "Removed working copy"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.root.display(),
                error = %e,
                "Failed to remove working copy"
            ),
        }
    }
}

async fn remove_stale(root: &Path) -> Result<(), VcsError> {
    match tokio::fs::remove_dir_all(root).await {
        Ok(()) => {
            tracing::info!(path = %root.display(), "Removed stale working copy");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(root, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(s: &str) -> TaskId {
        TaskId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn fresh_clears_leftovers_and_drop_cleans_up() {
        let base = tempfile::tempdir().unwrap();
        let stale = base.path().join("t42/.git");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("HEAD"), "ref: refs/heads/old\n").unwrap();

        let copy = WorkingCopy::fresh(base.path(), &task("t42")).await.unwrap();
        assert!(copy.path().is_dir());
        assert!(!stale.exists());

        copy.write_file(&ArtifactFile::new("nested/index.html", "<html/>"))
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(copy.path().join("nested/index.html")).unwrap(),
            "<html/>"
        );

        let root = copy.path().to_path_buf();
        copy.remove().await;
        assert!(!root.exists());
        assert!(base.path().exists());
    }

    #[tokio::test]
    async fn cancelled_step_still_cleans_up() {
        let base = tempfile::tempdir().unwrap();
        let copy = WorkingCopy::fresh(base.path(), &task("t7")).await.unwrap();
        copy.write_file(&ArtifactFile::new("index.html", "<html/>"))
            .await
            .unwrap();
        let root = copy.path().to_path_buf();

        let step = tokio::spawn(async move {
            let _copy = copy;
            std::future::pending::<()>().await;
        });
        tokio::task::yield_now().await;
        assert!(root.exists());

        step.abort();
        assert!(step.await.unwrap_err().is_cancelled());
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn reserve_does_not_create_directory() {
        let base = tempfile::tempdir().unwrap();
        let copy = WorkingCopy::reserve(&base.path().join("ws"), &task("t1"))
            .await
            .unwrap();
        assert!(!copy.path().exists());
        assert!(base.path().join("ws").is_dir());
        // Dropping a never-created directory is fine.
        drop(copy);
    }

    #[tokio::test]
    async fn remove_after_failed_clone_is_quiet() {
        let base = tempfile::tempdir().unwrap();
        let copy = WorkingCopy::reserve(base.path(), &task("t9")).await.unwrap();
        let root = copy.path().to_path_buf();
        copy.remove().await;
        assert!(!root.exists());
        assert!(base.path().is_dir());
    }
}
