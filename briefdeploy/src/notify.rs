//! Post the publication outcome back to the caller.

use async_trait::async_trait;

use crate::error::NotificationError;
use crate::types::{Correlation, NotificationPayload, PublicationRecord, Round, TaskId};

/// Reports a completed publication. Returns whether delivery succeeded;
/// failures are logged, never raised.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(
        &self,
        correlation: &Correlation,
        task: &TaskId,
        round: Round,
        record: &PublicationRecord,
    ) -> bool;
}

/// Notifier that POSTs JSON to the request's `evaluation_url`.
#[derive(Clone, Default)]
pub struct HttpNotifier {
    http: reqwest::Client,
}

impl HttpNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    async fn deliver(
        &self,
        correlation: &Correlation,
        task: &TaskId,
        round: Round,
        record: &PublicationRecord,
    ) -> Result<(), NotificationError> {
        let url = correlation
            .evaluation_url
            .as_deref()
            .ok_or(NotificationError::MissingCallback)?;

        let payload = NotificationPayload {
            email: correlation.email.as_deref(),
            task: task.as_str(),
            round: round.get(),
            nonce: correlation.nonce.as_deref(),
            repo_url: &record.repo_url,
            commit_sha: record.commit_sha.as_str(),
            pages_url: &record.pages_url,
        };

        tracing::info!(%url, "Sending notification");
        let resp = self.http.post(url).json(&payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NotificationError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notify for HttpNotifier {
    async fn notify(
        &self,
        correlation: &Correlation,
        task: &TaskId,
        round: Round,
        record: &PublicationRecord,
    ) -> bool {
        match self.deliver(correlation, task, round, record).await {
            Ok(()) => {
                tracing::info!(%task, %round, "Notified evaluation server");
                true
            }
            Err(NotificationError::MissingCallback) => {
                tracing::warn!(%task, %round, "No evaluation_url in request, skipping notification");
                false
            }
            Err(e) => {
                tracing::error!(%task, %round, error = %e, "Failed to notify evaluation server");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CommitSha;

    fn record() -> PublicationRecord {
        PublicationRecord {
            repo_url: "https://github.com/e4ayush/t42".into(),
            pages_url: "https://e4ayush.github.io/t42/".into(),
            commit_sha: CommitSha::new("abc123"),
        }
    }

    #[tokio::test]
    async fn missing_callback_is_a_quiet_failure() {
        let notifier = HttpNotifier::new();
        let delivered = notifier
            .notify(
                &Correlation::default(),
                &TaskId::parse("t42").unwrap(),
                Round::new(1).unwrap(),
                &record(),
            )
            .await;
        assert!(!delivered);
    }

    #[tokio::test]
    async fn unreachable_callback_is_a_quiet_failure() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let correlation = Correlation {
            evaluation_url: Some(format!("http://{addr}/notify")),
            ..Default::default()
        };
        let delivered = HttpNotifier::new()
            .notify(
                &correlation,
                &TaskId::parse("t42").unwrap(),
                Round::new(2).unwrap(),
                &record(),
            )
            .await;
        assert!(!delivered);
    }

    #[test]
    fn payload_shape() {
        let rec = record();
        let payload = NotificationPayload {
            email: Some("a@b.c"),
            task: "t42",
            round: 2,
            nonce: Some("n-1"),
            repo_url: &rec.repo_url,
            commit_sha: rec.commit_sha.as_str(),
            pages_url: &rec.pages_url,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({
                "email": "a@b.c",
                "task": "t42",
                "round": 2,
                "nonce": "n-1",
                "repo_url": "https://github.com/e4ayush/t42",
                "commit_sha": "abc123",
                "pages_url": "https://e4ayush.github.io/t42/",
            })
        );
    }
}
