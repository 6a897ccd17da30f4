//! reprov core library
//!
//! Provisions GitHub repositories in bulk: pushes a local set of workflow
//! files, uploads sealed Actions secrets, and sets Actions permissions.

pub mod error;
pub mod git;
pub mod github;
pub mod locator;
pub mod permissions;
pub mod pipeline;
pub mod report;
pub mod sealing;
pub mod secrets;
pub mod telemetry;
pub mod workflows;

pub use error::{ProvisionError, Result};
pub use git::{resolve_default_branch, BranchProbe, Git};
pub use github::{
    ActionsPublicKey, EncryptedSecret, GitHubClient, GitHubConfig, HostingApi, DEFAULT_API_BASE,
};
pub use locator::{
    parse_repository_url, parse_repository_url_for, RepositoryTarget, DEFAULT_GIT_HOST,
};
pub use permissions::{update_permissions, ActionsPermissions, WorkflowPermission};
pub use pipeline::{Provisioner, DEFAULT_REPO_DELAY};
pub use report::{
    render_summary, write_summary_json, ProcessingResult, ProcessingStatus, RunSummary,
    NOT_ACCESSIBLE,
};
pub use sealing::seal_secret;
pub use secrets::{
    is_valid_secret_name, missing_secrets, SecretOutcome, SecretProvisioner, SecretSpec,
    DEFAULT_SECRET_NAMES,
};
pub use telemetry::init_tracing;
pub use workflows::{
    copy_workflow_files, CommitIdentity, GitRemote, GitWorkflowPusher, PushOutcome,
    WorkflowPublisher,
};

/// reprov version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
