//! `git` + `gh` implementation of [`VersionControl`].
//!
//! Every step is a child process run to completion; a non-zero exit aborts
//! the operation with the step's captured stderr. Nothing is retried.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use super::{VersionControl, WorkingCopy};
use crate::config::Settings;
use crate::error::VcsError;
use crate::types::{ArtifactFile, CommitSha, TaskId};

pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit";
pub const REVISION_COMMIT_MESSAGE: &str = "Revise code based on new brief";

/// Drives the `git` and `gh` executables named in [`Settings`].
pub struct GitCli {
    settings: Settings,
}

impl GitCli {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Run one step and return its trimmed stdout.
    async fn run(
        &self,
        step: &'static str,
        program: &str,
        args: &[&str],
        cwd: &Path,
    ) -> Result<String, VcsError> {
        tracing::debug!(step, cwd = %cwd.display(), "Running");
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);
        if let Ok(token) = self.settings.access_token() {
            cmd.env("GH_TOKEN", token);
        }

        let output = cmd.output().await.map_err(|source| VcsError::Spawn {
            program: program.to_string(),
            source,
        })?;

        if !output.status.success() {
            let stderr = self.redact(String::from_utf8_lossy(&output.stderr).trim());
            let status = match output.status.code() {
                Some(code) => format!("exit code {code}"),
                None => "killed by signal".to_string(),
            };
            tracing::warn!(step, %status, %stderr, "Step failed");
            return Err(VcsError::Step {
                step,
                status,
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn git(&self, step: &'static str, args: &[&str], cwd: &Path) -> Result<String, VcsError> {
        self.run(step, &self.settings.git_bin, args, cwd).await
    }

    /// `git commit` with the account as author, independent of global git config.
    async fn commit(&self, message: &str, cwd: &Path) -> Result<(), VcsError> {
        let name = format!("user.name={}", self.settings.account);
        let email = format!("user.email={}", self.settings.commit_email());
        self.git(
            "git commit",
            &["-c", &name, "-c", &email, "commit", "--allow-empty", "-m", message],
            cwd,
        )
        .await?;
        Ok(())
    }

    async fn head(&self, cwd: &Path) -> Result<CommitSha, VcsError> {
        let sha = self.git("git rev-parse", &["rev-parse", "HEAD"], cwd).await?;
        Ok(CommitSha::new(sha))
    }

    /// Keep the access token out of logs and error bodies.
    fn redact(&self, text: &str) -> String {
        match self.settings.access_token() {
            Ok(token) => text.replace(token, "***"),
            Err(_) => text.to_string(),
        }
    }

    async fn publish_new(
        &self,
        copy: &WorkingCopy,
        task: &TaskId,
        files: &[ArtifactFile],
    ) -> Result<CommitSha, VcsError> {
        for file in files {
            copy.write_file(file).await?;
        }
        let dir = copy.path();

        let init_branch = format!("--initial-branch={}", self.settings.branch);
        self.git("git init", &["init", &init_branch], dir).await?;
        self.git("git add", &["add", "."], dir).await?;
        self.commit(INITIAL_COMMIT_MESSAGE, dir).await?;
        let sha = self.head(dir).await?;
        tracing::info!(%task, %sha, "Created local history");

        let full_name = format!("{}/{}", self.settings.account, task);
        self.run(
            "gh repo create",
            &self.settings.gh_bin,
            &["repo", "create", &full_name, "--public", "--source=.", "--push"],
            dir,
        )
        .await?;
        tracing::info!(repo = %full_name, "Created and pushed remote repository");

        Ok(sha)
    }

    async fn revise_clone(
        &self,
        copy: &WorkingCopy,
        url: &str,
        task: &TaskId,
        file: &ArtifactFile,
    ) -> Result<CommitSha, VcsError> {
        self.git(
            "git clone",
            &["clone", url, task.as_str()],
            &self.settings.workspace,
        )
        .await?;
        tracing::info!(%task, "Cloned existing repository");

        let dir = copy.path();
        copy.write_file(file).await?;
        self.git("git add", &["add", &file.path], dir).await?;
        self.commit(REVISION_COMMIT_MESSAGE, dir).await?;
        self.git("git push", &["push", "origin", "HEAD"], dir).await?;
        let sha = self.head(dir).await?;
        tracing::info!(%task, %sha, "Pushed revision");

        Ok(sha)
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn create_and_publish(
        &self,
        task: &TaskId,
        files: &[ArtifactFile],
    ) -> Result<CommitSha, VcsError> {
        let copy = WorkingCopy::fresh(&self.settings.workspace, task).await?;
        let result = self.publish_new(&copy, task, files).await;
        copy.remove().await;
        result
    }

    async fn clone_revise_and_push(
        &self,
        task: &TaskId,
        file: &ArtifactFile,
    ) -> Result<CommitSha, VcsError> {
        let url = self.settings.clone_url(task)?;
        let copy = WorkingCopy::reserve(&self.settings.workspace, task).await?;
        let result = self.revise_clone(&copy, &url, task, file).await;
        copy.remove().await;
        result
    }
}
