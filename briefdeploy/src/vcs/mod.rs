//! Version control adapter.
//!
//! Two operations cover the whole lifecycle of a published artifact:
//! creating its repository on round 1, and revising its single generated
//! file on every later round. Both run inside a scoped [`WorkingCopy`].

mod git;
mod workdir;

use async_trait::async_trait;

use crate::error::VcsError;
use crate::types::{ArtifactFile, CommitSha, TaskId};

pub use git::{GitCli, INITIAL_COMMIT_MESSAGE, REVISION_COMMIT_MESSAGE};
pub use workdir::WorkingCopy;

#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Start fresh local history holding `files`, create the public remote
    /// repository and push to it. Must not be called concurrently for the
    /// same task.
    async fn create_and_publish(
        &self,
        task: &TaskId,
        files: &[ArtifactFile],
    ) -> Result<CommitSha, VcsError>;

    /// Clone the existing remote, overwrite `file`, commit and push.
    /// The clone is gone when this returns, whatever the outcome.
    async fn clone_revise_and_push(
        &self,
        task: &TaskId,
        file: &ArtifactFile,
    ) -> Result<CommitSha, VcsError>;
}
