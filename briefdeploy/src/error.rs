//! Error taxonomy for a deployment request.

use std::path::PathBuf;

use axum::http::StatusCode;
use thiserror::Error;

/// A required secret was not configured.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
}

/// The content generator produced nothing usable.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("language model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("language model returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("language model response has no choices[0].message.content")]
    MissingContent,

    #[error("language model returned an empty document")]
    Empty,
}

/// A git or hosting CLI step failed.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} failed ({status}): {stderr}")]
    Step {
        step: &'static str,
        status: String,
        stderr: String,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> VcsError {
    VcsError::Io {
        path: path.into(),
        source,
    }
}

/// The callback could not be delivered. Logged, never surfaced to the caller.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("no evaluation_url in request")]
    MissingCallback,

    #[error("callback request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("callback returned {0}")]
    Status(u16),
}

/// Everything that can fail a request, as seen by the HTTP handler.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Invalid secret")]
    Unauthorized,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to generate code: {0}")]
    Generation(#[from] GenerationError),

    #[error("Failed to deploy to GitHub: {0}")]
    Vcs(#[from] VcsError),
}

impl DeployError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DeployError::Unauthorized => StatusCode::FORBIDDEN,
            DeployError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DeployError::Generation(_) => StatusCode::BAD_GATEWAY,
            DeployError::Vcs(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_failure_class_has_its_own_status() {
        let codes = [
            DeployError::Unauthorized.status_code(),
            DeployError::InvalidRequest("x".into()).status_code(),
            DeployError::Generation(GenerationError::Empty).status_code(),
            DeployError::Vcs(VcsError::Config(ConfigError::Missing("GITHUB_PAT"))).status_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert!(!a.is_success());
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn missing_token_reads_as_a_deploy_failure() {
        let err = DeployError::from(VcsError::from(ConfigError::Missing("GITHUB_PAT")));
        assert_eq!(err.to_string(), "Failed to deploy to GitHub: GITHUB_PAT is not set");
    }
}
