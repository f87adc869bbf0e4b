//! Publication orchestrator: the round-aware deployment state machine.
//!
//! No state survives between calls. The round alone picks the branch:
//! round 1 builds a new repository from scratch, every later round clones
//! it and replaces the generated page. Notification fires only once a
//! commit exists.

use std::sync::Arc;

use crate::artifacts;
use crate::config::Settings;
use crate::error::{DeployError, VcsError};
use crate::llm::{ContentGenerator, LlmClient};
use crate::notify::{HttpNotifier, Notify};
use crate::types::{DeployJob, DeployMode, PublicationRecord, Round, TaskId};
use crate::vcs::{GitCli, VersionControl};

/// Outcome of a successful deployment.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub record: PublicationRecord,
    /// Whether the callback accepted the notification.
    pub notified: bool,
}

pub struct Orchestrator {
    settings: Settings,
    generator: Arc<dyn ContentGenerator>,
    vcs: Arc<dyn VersionControl>,
    notifier: Arc<dyn Notify>,
}

impl Orchestrator {
    pub fn new(
        settings: Settings,
        generator: Arc<dyn ContentGenerator>,
        vcs: Arc<dyn VersionControl>,
        notifier: Arc<dyn Notify>,
    ) -> Self {
        Self {
            settings,
            generator,
            vcs,
            notifier,
        }
    }

    /// Production wiring: chat-completions generator, git/gh adapter,
    /// HTTP notifier.
    pub fn from_settings(settings: Settings) -> Self {
        let generator = Arc::new(LlmClient::new(&settings));
        let vcs = Arc::new(GitCli::new(settings.clone()));
        Self::new(settings, generator, vcs, Arc::new(HttpNotifier::new()))
    }

    /// Repository and pages URLs for `task`. Pure naming convention, so it
    /// cannot fail and needs no network.
    pub fn publication_urls(&self, task: &TaskId) -> (String, String) {
        (self.settings.repo_url(task), self.settings.pages_url(task))
    }

    /// Commit `html` for `task` via the branch that `round` selects.
    pub async fn publish(
        &self,
        task: &TaskId,
        round: Round,
        html: &str,
    ) -> Result<PublicationRecord, VcsError> {
        let commit_sha = match round.mode() {
            DeployMode::Create => {
                tracing::info!(%task, "Round 1: creating new repository");
                let files = artifacts::initial_files(html, task, &self.settings.account);
                self.vcs.create_and_publish(task, &files).await?
            }
            DeployMode::Revise => {
                tracing::info!(%task, %round, "Updating existing repository");
                self.vcs
                    .clone_revise_and_push(task, &artifacts::index(html))
                    .await?
            }
        };

        let (repo_url, pages_url) = self.publication_urls(task);
        Ok(PublicationRecord {
            repo_url,
            pages_url,
            commit_sha,
        })
    }

    /// Generate, publish, notify.
    pub async fn deploy(&self, job: &DeployJob) -> Result<Deployment, DeployError> {
        let html = self.generator.generate(&job.brief).await.map_err(|e| {
            tracing::error!(task = %job.task, error = %e, "Generation failed");
            e
        })?;
        tracing::info!(task = %job.task, bytes = html.len(), "Generated app");

        let record = self.publish(&job.task, job.round, &html).await.map_err(|e| {
            tracing::error!(task = %job.task, round = %job.round, error = %e, "Deployment failed");
            e
        })?;
        tracing::info!(
            task = %job.task,
            round = %job.round,
            commit = %record.commit_sha,
            pages = %record.pages_url,
            "Published"
        );

        let notified = self
            .notifier
            .notify(&job.correlation, &job.task, job.round, &record)
            .await;

        Ok(Deployment { record, notified })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::GenerationError;
    use crate::types::{ArtifactFile, CommitSha, Correlation};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create(Vec<String>),
        Revise(String, String),
    }

    #[derive(Default)]
    struct RecordingVcs {
        calls: Mutex<Vec<Call>>,
        fail: bool,
    }

    impl RecordingVcs {
        fn result(&self) -> Result<CommitSha, VcsError> {
            if self.fail {
                Err(VcsError::Step {
                    step: "git push",
                    status: "exit code 1".into(),
                    stderr: "rejected".into(),
                })
            } else {
                Ok(CommitSha::new("0123abcd"))
            }
        }
    }

    #[async_trait]
    impl VersionControl for RecordingVcs {
        async fn create_and_publish(
            &self,
            _task: &TaskId,
            files: &[ArtifactFile],
        ) -> Result<CommitSha, VcsError> {
            let paths = files.iter().map(|f| f.path.clone()).collect();
            self.calls.lock().unwrap().push(Call::Create(paths));
            self.result()
        }

        async fn clone_revise_and_push(
            &self,
            _task: &TaskId,
            file: &ArtifactFile,
        ) -> Result<CommitSha, VcsError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Revise(file.path.clone(), file.contents.clone()));
            self.result()
        }
    }

    struct FixedGenerator(Option<&'static str>);

    #[async_trait]
    impl ContentGenerator for FixedGenerator {
        async fn generate(&self, _brief: &str) -> Result<String, GenerationError> {
            self.0.map(str::to_string).ok_or(GenerationError::Empty)
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, u32, PublicationRecord)>>,
        accept: bool,
    }

    #[async_trait]
    impl Notify for RecordingNotifier {
        async fn notify(
            &self,
            _correlation: &Correlation,
            task: &TaskId,
            round: Round,
            record: &PublicationRecord,
        ) -> bool {
            self.sent
                .lock()
                .unwrap()
                .push((task.to_string(), round.get(), record.clone()));
            self.accept
        }
    }

    struct Harness {
        vcs: Arc<RecordingVcs>,
        notifier: Arc<RecordingNotifier>,
        orchestrator: Orchestrator,
    }

    fn harness(html: Option<&'static str>, vcs_fails: bool, notify_ok: bool) -> Harness {
        let vcs = Arc::new(RecordingVcs {
            fail: vcs_fails,
            ..Default::default()
        });
        let notifier = Arc::new(RecordingNotifier {
            accept: notify_ok,
            ..Default::default()
        });
        let orchestrator = Orchestrator::new(
            Settings::new("e4ayush", "/tmp/unused"),
            Arc::new(FixedGenerator(html)),
            vcs.clone(),
            notifier.clone(),
        );
        Harness {
            vcs,
            notifier,
            orchestrator,
        }
    }

    fn job(task: &str, round: i64) -> DeployJob {
        DeployJob {
            brief: "todo app".into(),
            task: TaskId::parse(task).unwrap(),
            round: Round::new(round).unwrap(),
            correlation: Correlation {
                evaluation_url: Some("http://127.0.0.1:9/notify".into()),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn round_one_creates_with_three_files_and_never_clones() {
        let h = harness(Some("<html/>"), false, true);
        let out = h.orchestrator.deploy(&job("todoapp1", 1)).await.unwrap();

        assert_eq!(
            *h.vcs.calls.lock().unwrap(),
            vec![Call::Create(vec![
                "index.html".into(),
                "LICENSE".into(),
                "README.md".into()
            ])]
        );
        assert_eq!(out.record.commit_sha.as_str(), "0123abcd");
        assert!(out.notified);
        assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn later_rounds_revise_only_the_page() {
        let h = harness(Some("<html>v2</html>"), false, true);
        h.orchestrator.deploy(&job("todoapp1", 2)).await.unwrap();
        h.orchestrator.deploy(&job("todoapp1", 5)).await.unwrap();

        let calls = h.vcs.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        for call in calls.iter() {
            assert_eq!(
                *call,
                Call::Revise("index.html".into(), "<html>v2</html>".into())
            );
        }
    }

    #[tokio::test]
    async fn urls_are_identical_across_rounds() {
        let h = harness(Some("<html/>"), false, true);
        for round in [1, 2, 3] {
            let out = h.orchestrator.deploy(&job("t42", round)).await.unwrap();
            assert_eq!(out.record.repo_url, "https://github.com/e4ayush/t42");
            assert_eq!(out.record.pages_url, "https://e4ayush.github.io/t42/");
        }
    }

    #[tokio::test]
    async fn generation_failure_touches_nothing() {
        let h = harness(None, false, true);
        let err = h.orchestrator.deploy(&job("todoapp1", 1)).await.unwrap_err();

        assert!(matches!(err, DeployError::Generation(_)));
        assert!(h.vcs.calls.lock().unwrap().is_empty());
        assert!(h.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn vcs_failure_skips_notification() {
        let h = harness(Some("<html/>"), true, true);
        let err = h.orchestrator.deploy(&job("todoapp1", 3)).await.unwrap_err();

        assert!(matches!(err, DeployError::Vcs(VcsError::Step { step: "git push", .. })));
        assert!(h.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_notification_is_still_a_deployment() {
        let h = harness(Some("<html/>"), false, false);
        let out = h.orchestrator.deploy(&job("todoapp1", 1)).await.unwrap();

        assert!(!out.notified);
        let sent = h.notifier.sent.lock().unwrap();
        assert_eq!(sent[0].0, "todoapp1");
        assert_eq!(sent[0].1, 1);
        assert_eq!(sent[0].2, out.record);
    }
}
