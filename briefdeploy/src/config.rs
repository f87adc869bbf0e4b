//! Command-line and environment configuration.
//!
//! `Args` is what clap parses; `Settings` is the immutable subset handed to
//! the generator, the VCS adapter and the orchestrator at construction.
//! Secrets are optional here and checked where they are used.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;
use crate::types::TaskId;

#[derive(Parser, Debug, Clone)]
#[command(name = "briefdeploy", about = "Brief in, published GitHub Pages app out")]
pub struct Args {
    /// Address to serve the HTTP API on
    #[arg(long, env = "BRIEFDEPLOY_LISTEN", default_value = "127.0.0.1:5000")]
    pub listen: SocketAddr,

    /// Shared secret every request must present
    #[arg(long, env = "BRIEFDEPLOY_SECRET")]
    pub secret: String,

    /// Hosting account that owns the published repositories
    #[arg(long, env = "GITHUB_ACCOUNT", default_value = "e4ayush")]
    pub account: String,

    /// Git hosting domain
    #[arg(long, default_value = "github.com")]
    pub git_host: String,

    /// Pages domain; sites are served from <account>.<pages-host>
    #[arg(long, default_value = "github.io")]
    pub pages_host: String,

    /// Branch created for new repositories
    #[arg(long, default_value = "main")]
    pub branch: String,

    /// Scratch directory for working copies
    #[arg(long, default_value = "/tmp/briefdeploy")]
    pub workspace: PathBuf,

    /// Chat-completions endpoint of the language model
    #[arg(
        long,
        env = "LLM_API_URL",
        default_value = "https://aipipe.org/openrouter/v1/chat/completions"
    )]
    pub llm_url: String,

    /// Model to request
    #[arg(long, env = "LLM_MODEL", default_value = "openai/gpt-3.5-turbo")]
    pub model: String,

    /// Language model API key
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Access token used for authenticated clones and `gh`
    #[arg(long, env = "GITHUB_PAT", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Clone revisions from <clone-base>/<task>.git instead of the hosting account
    #[arg(long)]
    pub clone_base: Option<String>,

    /// git executable
    #[arg(long, default_value = "git")]
    pub git_bin: String,

    /// GitHub CLI executable
    #[arg(long, default_value = "gh")]
    pub gh_bin: String,
}

/// Immutable deployment settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub account: String,
    pub git_host: String,
    pub pages_host: String,
    pub branch: String,
    pub workspace: PathBuf,
    pub llm_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub clone_base: Option<String>,
    pub git_bin: String,
    pub gh_bin: String,
}

impl Settings {
    /// Defaults for the given account; mostly useful for tests.
    pub fn new(account: impl Into<String>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            account: account.into(),
            git_host: "github.com".to_string(),
            pages_host: "github.io".to_string(),
            branch: "main".to_string(),
            workspace: workspace.into(),
            llm_url: "https://aipipe.org/openrouter/v1/chat/completions".to_string(),
            model: "openai/gpt-3.5-turbo".to_string(),
            api_key: None,
            access_token: None,
            clone_base: None,
            git_bin: "git".to_string(),
            gh_bin: "gh".to_string(),
        }
    }

    pub fn repo_url(&self, task: &TaskId) -> String {
        format!("https://{}/{}/{}", self.git_host, self.account, task)
    }

    pub fn pages_url(&self, task: &TaskId) -> String {
        format!("https://{}.{}/{}/", self.account, self.pages_host, task)
    }

    /// URL that `git clone` should use for a revision round.
    pub fn clone_url(&self, task: &TaskId) -> Result<String, ConfigError> {
        if let Some(base) = &self.clone_base {
            return Ok(format!("{}/{}.git", base.trim_end_matches('/'), task));
        }
        let token = self.access_token()?;
        Ok(format!(
            "https://{token}@{}/{}/{}.git",
            self.git_host, self.account, task
        ))
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::Missing("LLM_API_KEY"))
    }

    pub fn access_token(&self) -> Result<&str, ConfigError> {
        self.access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing("GITHUB_PAT"))
    }

    /// Author e-mail for commits made on the account's behalf.
    pub fn commit_email(&self) -> String {
        format!("{}@users.noreply.{}", self.account, self.git_host)
    }
}

impl From<&Args> for Settings {
    fn from(args: &Args) -> Self {
        Self {
            account: args.account.clone(),
            git_host: args.git_host.clone(),
            pages_host: args.pages_host.clone(),
            branch: args.branch.clone(),
            workspace: args.workspace.clone(),
            llm_url: args.llm_url.clone(),
            model: args.model.clone(),
            api_key: args.api_key.clone(),
            access_token: args.github_token.clone(),
            clone_base: args.clone_base.clone(),
            git_bin: args.git_bin.clone(),
            gh_bin: args.gh_bin.clone(),
        }
    }
}
