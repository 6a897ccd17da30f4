//! Pushing workflow definition files into repositories.
//!
//! [`GitWorkflowPusher`] clones a repository into a scratch directory, copies
//! every `.yml`/`.yaml` file from a local source directory into
//! `.github/workflows/`, and commits and pushes only when the staged tree
//! actually changed. The scratch clone is dropped on every exit path.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::git::Git;
use crate::locator::RepositoryTarget;

/// Destination directory inside the repository.
pub const WORKFLOWS_DIR: &str = ".github/workflows";

/// Commit message used for workflow updates.
pub const COMMIT_MESSAGE: &str = "Add/Update GitHub Actions workflows";

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum PushOutcome {
    /// A commit was created and pushed to `branch`.
    Pushed { branch: String, files: Vec<String> },
    /// The repository already carried identical workflow files.
    AlreadyUpToDate { files: Vec<String> },
}

/// Places the workflow set into a repository.
#[async_trait]
pub trait WorkflowPublisher: Send + Sync {
    async fn publish(&self, repo: &RepositoryTarget) -> Result<PushOutcome>;
}

/// Where clones come from.
#[derive(Debug, Clone)]
pub enum GitRemote {
    /// `https://<token>@<host>/<owner>/<name>.git`
    Https { host: String, token: String },
    /// `<base>/<owner>/<name>.git`, for mirrors and local bare repositories.
    Base(String),
}

impl GitRemote {
    pub fn github(token: &str) -> Self {
        GitRemote::Https {
            host: crate::locator::DEFAULT_GIT_HOST.to_string(),
            token: token.to_string(),
        }
    }

    pub fn clone_url(&self, repo: &RepositoryTarget) -> String {
        match self {
            GitRemote::Https { host, token } => {
                format!("https://{token}@{host}/{}/{}.git", repo.owner, repo.name)
            }
            GitRemote::Base(base) => {
                format!("{}/{}/{}.git", base.trim_end_matches('/'), repo.owner, repo.name)
            }
        }
    }

    /// Credential that must never appear in reported errors.
    pub fn secret(&self) -> Option<&str> {
        match self {
            GitRemote::Https { token, .. } => Some(token),
            GitRemote::Base(_) => None,
        }
    }
}

/// Author identity passed as `-c user.name/-c user.email` on commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

/// Is `path` a workflow definition by extension?
pub fn is_workflow_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Copy every workflow file directly under `source` into `dest`, keeping
/// permissions and modification time. Returns the copied file names, sorted.
pub fn copy_workflow_files(source: &Path, dest: &Path) -> Result<Vec<String>> {
    fs::create_dir_all(dest)?;

    let entries = fs::read_dir(source)?.collect::<std::io::Result<Vec<_>>>()?;
    let mut sources: Vec<PathBuf> = entries
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_workflow_file(path))
        .collect();
    sources.sort();

    let mut copied = Vec::with_capacity(sources.len());
    for src in sources {
        let Some(file_name) = src.file_name() else {
            continue;
        };
        let target = dest.join(file_name);
        fs::copy(&src, &target)?;

        let modified = fs::metadata(&src)?.modified()?;
        fs::File::options()
            .write(true)
            .open(&target)?
            .set_modified(modified)?;

        let name = file_name.to_string_lossy().to_string();
        debug!(file = %name, "copied workflow");
        copied.push(name);
    }

    Ok(copied)
}

/// [`WorkflowPublisher`] backed by the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitWorkflowPusher {
    source_dir: PathBuf,
    remote: GitRemote,
    identity: Option<CommitIdentity>,
    scratch_root: Option<PathBuf>,
}

impl GitWorkflowPusher {
    pub fn new(source_dir: impl Into<PathBuf>, remote: GitRemote) -> Self {
        GitWorkflowPusher {
            source_dir: source_dir.into(),
            remote,
            identity: None,
            scratch_root: None,
        }
    }

    pub fn with_identity(mut self, identity: CommitIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Create scratch clones under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    async fn commit(&self, git: Git<'_>) -> Result<()> {
        let mut args: Vec<String> = Vec::new();
        if let Some(identity) = &self.identity {
            args.push("-c".to_string());
            args.push(format!("user.name={}", identity.name));
            args.push("-c".to_string());
            args.push(format!("user.email={}", identity.email));
        }
        args.extend(["commit", "-m", COMMIT_MESSAGE].map(String::from));

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        git.run(&args).await.map(|_| ())
    }
}

#[async_trait]
impl WorkflowPublisher for GitWorkflowPusher {
    async fn publish(&self, repo: &RepositoryTarget) -> Result<PushOutcome> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("reprov-");
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let checkout = scratch.path().join(&repo.name);
        let checkout_arg = checkout.to_string_lossy().to_string();
        let clone_url = self.remote.clone_url(repo);

        info!(repo = %repo, "cloning repository");
        Git::new(scratch.path())
            .redacting(self.remote.secret())
            .run(&["clone", &clone_url, &checkout_arg])
            .await?;

        let git = Git::new(&checkout).redacting(self.remote.secret());
        let files = copy_workflow_files(&self.source_dir, &checkout.join(WORKFLOWS_DIR))?;
        info!(repo = %repo, count = files.len(), "copied workflow files");

        git.run(&["add", &format!("{WORKFLOWS_DIR}/")]).await?;
        if !git.has_staged_changes().await? {
            info!(repo = %repo, "no changes to commit (workflows already up to date)");
            return Ok(PushOutcome::AlreadyUpToDate { files });
        }

        self.commit(git).await?;

        let branch = git.default_branch().await;
        info!(repo = %repo, branch = %branch, "pushing workflows");
        git.run(&["push", "origin", &branch]).await?;

        Ok(PushOutcome::Pushed { branch, files })
    }
}
