//! Request, identity and outcome types shared by every stage of a deployment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// Longest task identifier GitHub accepts as a repository name.
const MAX_TASK_LEN: usize = 100;

/// Stable key for one artifact's lifecycle.
///
/// Names both the hosting repository and the local working directory, so it
/// is restricted to characters that are safe in both places.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn parse(raw: &str) -> Result<Self, DeployError> {
        if raw.is_empty() || raw.len() > MAX_TASK_LEN {
            return Err(DeployError::InvalidRequest(format!(
                "task must be 1-{MAX_TASK_LEN} characters"
            )));
        }
        if raw == "." || raw == ".." {
            return Err(DeployError::InvalidRequest(format!("task '{raw}' is reserved")));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(DeployError::InvalidRequest(format!(
                "task contains invalid character {bad:?}"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which branch of the state machine a round selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    /// Round 1: build a fresh repository.
    Create,
    /// Any later round: clone, replace the artifact, push.
    Revise,
}

/// A validated round number (always >= 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Round(u32);

impl Round {
    pub fn new(raw: i64) -> Result<Self, DeployError> {
        u32::try_from(raw)
            .ok()
            .filter(|n| *n >= 1)
            .map(Self)
            .ok_or_else(|| DeployError::InvalidRequest(format!("round must be >= 1, got {raw}")))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn mode(self) -> DeployMode {
        if self.0 == 1 {
            DeployMode::Create
        } else {
            DeployMode::Revise
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full commit hash as printed by `git rev-parse HEAD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitSha(String);

impl CommitSha {
    pub fn new(sha: impl Into<String>) -> Self {
        Self(sha.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file to place in a working copy, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub path: String,
    pub contents: String,
}

impl ArtifactFile {
    pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Where a deployment landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicationRecord {
    pub repo_url: String,
    pub pages_url: String,
    pub commit_sha: CommitSha,
}

/// Caller-supplied fields echoed back in the notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correlation {
    pub email: Option<String>,
    pub nonce: Option<String>,
    pub evaluation_url: Option<String>,
}

/// Inbound request body for `POST /api-endpoint`.
///
/// Every field is optional at the wire level so that a missing secret is
/// reported as an authentication failure rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeployRequest {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub brief: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub round: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub evaluation_url: Option<String>,
}

/// A validated unit of work for the orchestrator.
#[derive(Debug, Clone)]
pub struct DeployJob {
    pub brief: String,
    pub task: TaskId,
    pub round: Round,
    pub correlation: Correlation,
}

impl DeployJob {
    /// Validate the parts of a request the orchestrator depends on.
    /// Authentication is the caller's job and happens before this.
    pub fn from_request(req: DeployRequest) -> Result<Self, DeployError> {
        let brief = req
            .brief
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| DeployError::InvalidRequest("brief is required".into()))?;
        let task = req
            .task
            .as_deref()
            .ok_or_else(|| DeployError::InvalidRequest("task is required".into()))
            .and_then(TaskId::parse)?;
        let round = req
            .round
            .ok_or_else(|| DeployError::InvalidRequest("round is required".into()))
            .and_then(Round::new)?;
        Ok(Self {
            brief,
            task,
            round,
            correlation: Correlation {
                email: req.email,
                nonce: req.nonce,
                evaluation_url: req.evaluation_url.filter(|u| !u.trim().is_empty()),
            },
        })
    }
}

/// Body POSTed to the caller's callback URL.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload<'a> {
    pub email: Option<&'a str>,
    pub task: &'a str,
    pub round: u32,
    pub nonce: Option<&'a str>,
    pub repo_url: &'a str,
    pub commit_sha: &'a str,
    pub pages_url: &'a str,
}
