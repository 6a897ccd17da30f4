//! Sequential per-repository provisioning.
//!
//! [`Provisioner`] walks the configured repositories strictly in order. For
//! each reachable repository it attempts three independent stages (workflow
//! push, secrets, permissions); a failure in one stage is recorded and never
//! prevents the next. A fixed pause separates consecutive repositories.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::github::HostingApi;
use crate::locator::{parse_repository_url_for, DEFAULT_GIT_HOST};
use crate::permissions::update_permissions;
use crate::report::{ProcessingResult, NOT_ACCESSIBLE};
use crate::secrets::{SecretOutcome, SecretProvisioner, SecretSpec};
use crate::workflows::{PushOutcome, WorkflowPublisher};

/// Pause inserted between repositories.
pub const DEFAULT_REPO_DELAY: Duration = Duration::from_secs(2);

/// Drives the provisioning stages for a list of repositories.
pub struct Provisioner {
    api: Arc<dyn HostingApi>,
    publisher: Arc<dyn WorkflowPublisher>,
    secrets: Vec<SecretSpec>,
    delay: Duration,
    git_host: String,
}

impl Provisioner {
    pub fn new(
        api: Arc<dyn HostingApi>,
        publisher: Arc<dyn WorkflowPublisher>,
        secrets: Vec<SecretSpec>,
    ) -> Self {
        Provisioner {
            api,
            publisher,
            secrets,
            delay: DEFAULT_REPO_DELAY,
            git_host: DEFAULT_GIT_HOST.to_string(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Accept repository URLs on `host` instead of github.com.
    pub fn with_git_host(mut self, host: impl Into<String>) -> Self {
        self.git_host = host.into();
        self
    }

    /// Process every repository in order, pausing between consecutive ones.
    pub async fn run(&self, repositories: &[String]) -> Vec<ProcessingResult> {
        let total = repositories.len();
        info!(total, "processing repositories");

        let mut results = Vec::with_capacity(total);
        for (idx, url) in repositories.iter().enumerate() {
            info!(index = idx + 1, total, repository = %url, "processing repository");
            results.push(self.process_repository(url).await);

            if idx + 1 < total && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }
        results
    }

    /// Run all stages against one repository URL.
    pub async fn process_repository(&self, url: &str) -> ProcessingResult {
        let repo = match parse_repository_url_for(url, &self.git_host) {
            Ok(repo) => repo,
            Err(e) => {
                error!(repository = %url, error = %e, "cannot parse repository");
                return ProcessingResult::error(url, e.to_string());
            }
        };

        match self.api.repository_exists(&repo).await {
            Ok(true) => {}
            Ok(false) => {
                error!(repo = %repo, "{NOT_ACCESSIBLE}");
                return ProcessingResult::error(url, NOT_ACCESSIBLE);
            }
            Err(e) => {
                error!(repo = %repo, error = %e, "existence check failed");
                return ProcessingResult::error(url, e.to_string());
            }
        }

        let mut result = ProcessingResult::reachable(url);

        match self.publisher.publish(&repo).await {
            Ok(PushOutcome::Pushed { branch, files }) => {
                info!(repo = %repo, branch = %branch, files = files.len(), "workflows pushed");
                result.workflows_pushed = true;
            }
            Ok(PushOutcome::AlreadyUpToDate { .. }) => {
                info!(repo = %repo, "workflows already up to date");
                result.workflows_pushed = true;
            }
            Err(e) => {
                warn!(repo = %repo, error = %e, "workflow push failed");
                result.record_error(format!("Failed to push workflows: {e}"));
            }
        }

        let provisioner = SecretProvisioner::new(self.api.as_ref());
        for spec in &self.secrets {
            let outcome = provisioner.provision(&repo, spec).await;
            result
                .secrets_added
                .insert(spec.name.clone(), outcome.is_added());
            if let SecretOutcome::Failed(reason) = outcome {
                result.record_error(format!("Failed to set secret {}: {reason}", spec.name));
            }
        }

        match update_permissions(self.api.as_ref(), &repo).await {
            Ok(()) => {
                info!(repo = %repo, "workflow permissions updated (read/write, PR approval)");
                result.permissions_updated = true;
            }
            Err(e) => {
                warn!(repo = %repo, error = %e, "permissions update failed");
                result.record_error(format!("Failed to update workflow permissions: {e}"));
            }
        }

        result.finish()
    }
}
