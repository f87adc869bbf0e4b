//! HTTP surface: shared-secret authentication and dispatch.
//!
//! `POST /api-endpoint` runs a whole deployment before answering.
//! `GET /health` is for load balancers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::error::DeployError;
use crate::orchestrator::Orchestrator;
use crate::types::{DeployJob, DeployRequest};

pub struct AppState {
    /// Value every request's `secret` field must equal.
    pub secret: String,
    pub orchestrator: Orchestrator,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api-endpoint", post(api_deploy))
        .route("/health", get(api_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the listener fails.
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Serialize)]
struct DeployResponse {
    status: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

struct ApiError(DeployError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

impl From<DeployError> for ApiError {
    fn from(e: DeployError) -> Self {
        Self(e)
    }
}

async fn api_deploy(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<DeployResponse>, ApiError> {
    // Only the secret is looked at until it matches, so an unauthenticated
    // caller learns nothing about the rest of the request shape.
    let body = match body {
        Ok(Json(value)) if presents_secret(&value, &state.secret) => value,
        _ => {
            tracing::warn!("Rejected request with invalid secret");
            return Err(DeployError::Unauthorized.into());
        }
    };

    let req: DeployRequest = serde_json::from_value(body)
        .map_err(|e| DeployError::InvalidRequest(format!("Invalid JSON: {e}")))?;

    let job = DeployJob::from_request(req)?;
    tracing::info!(task = %job.task, round = %job.round, "Accepted deployment request");

    let deployment = state.orchestrator.deploy(&job).await?;
    if !deployment.notified {
        tracing::warn!(task = %job.task, round = %job.round, "Published without notification");
    }

    Ok(Json(DeployResponse {
        status: format!("round_{}_deployed_and_notified", job.round),
    }))
}

fn presents_secret(body: &Value, secret: &str) -> bool {
    body.get("secret").and_then(Value::as_str) == Some(secret)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn api_health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
