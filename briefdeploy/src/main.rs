//! briefdeploy: HTTP service that turns briefs into GitHub Pages apps.
//!
//!   POST /api-endpoint   {secret, brief, task, round, email, nonce, evaluation_url}
//!   GET  /health
//!
//! Secrets: LLM_API_KEY for generation, GITHUB_PAT for revisions (and `gh`).
//! Both are read from the environment or a `.env` file and only checked
//! when a request needs them.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use briefdeploy::config::{Args, Settings};
use briefdeploy::orchestrator::Orchestrator;
use briefdeploy::web::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal in production.
    let _ = dotenvy::dotenv();

    // JSON logs in production (BRIEFDEPLOY_LOG_JSON=1), human-readable otherwise
    let json_logs = std::env::var("BRIEFDEPLOY_LOG_JSON").unwrap_or_default() == "1";
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "briefdeploy=info,tower_http=info".into());
    if json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let args = Args::parse();
    let settings = Settings::from(&args);

    tokio::fs::create_dir_all(&settings.workspace).await?;
    if settings.api_key.is_none() {
        tracing::warn!("LLM_API_KEY is not set; generation requests will fail");
    }
    if settings.access_token.is_none() {
        tracing::warn!("GITHUB_PAT is not set; revision rounds will fail");
    }

    tracing::info!(
        listen = %args.listen,
        account = %settings.account,
        workspace = %settings.workspace.display(),
        model = %settings.model,
        "Starting briefdeploy"
    );

    let state = Arc::new(AppState {
        secret: args.secret.clone(),
        orchestrator: Orchestrator::from_settings(settings),
    });

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    web::serve(listener, state).await
}
