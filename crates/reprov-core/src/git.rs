//! Thin async wrapper over the `git` command-line tool.

use std::path::Path;
use std::process::Output;

use tokio::process::Command;
use tracing::debug;

use crate::error::{ProvisionError, Result};

/// Fallback branch when nothing else can be determined.
pub const FALLBACK_BRANCH: &str = "main";

/// Local branches checked, in order, when the checkout has no current branch
/// and no remote HEAD.
pub const CONVENTIONAL_BRANCHES: [&str; 2] = ["main", "master"];

/// Replace every occurrence of `secret` in `text` with `***`.
pub fn redact(text: &str, secret: Option<&str>) -> String {
    match secret {
        Some(secret) if !secret.is_empty() => text.replace(secret, "***"),
        _ => text.to_string(),
    }
}

/// First argument that is the git subcommand, skipping `-c key=value` pairs.
fn subcommand<'a>(args: &[&'a str]) -> &'a str {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "-c" {
            iter.next();
            continue;
        }
        return arg;
    }
    ""
}

/// Runs git commands inside one working directory.
#[derive(Debug, Clone, Copy)]
pub struct Git<'a> {
    dir: &'a Path,
    secret: Option<&'a str>,
}

impl<'a> Git<'a> {
    pub fn new(dir: &'a Path) -> Self {
        Git { dir, secret: None }
    }

    /// Scrub `secret` from any error text this runner produces.
    pub fn redacting(mut self, secret: Option<&'a str>) -> Self {
        self.secret = secret;
        self
    }

    async fn output(&self, args: &[&str]) -> Result<Output> {
        debug!(dir = %self.dir.display(), command = subcommand(args), "running git");
        Command::new("git")
            .args(args)
            .current_dir(self.dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| ProvisionError::Git {
                command: subcommand(args).to_string(),
                stderr: format!("failed to run git: {e}"),
            })
    }

    fn failure(&self, args: &[&str], output: &Output) -> ProvisionError {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = if stderr.trim().is_empty() {
            format!("exit status {}", output.status)
        } else {
            stderr.trim().to_string()
        };
        ProvisionError::Git {
            command: subcommand(args).to_string(),
            stderr: redact(&stderr, self.secret),
        }
    }

    /// Run `git <args>` and return trimmed stdout; non-zero exit is an error.
    pub async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args).await?;
        if !output.status.success() {
            return Err(self.failure(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run `git <args>` and report only whether it exited zero.
    pub async fn succeeds(&self, args: &[&str]) -> bool {
        self.output(args)
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Whether the index differs from HEAD (`git diff --cached --quiet`).
    pub async fn has_staged_changes(&self) -> Result<bool> {
        let args = ["diff", "--cached", "--quiet"];
        let output = self.output(&args).await?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(self.failure(&args, &output)),
        }
    }

    /// Gather the facts the default-branch policy decides on.
    pub async fn probe_default_branch(&self) -> BranchProbe {
        let current = self
            .run(&["branch", "--show-current"])
            .await
            .ok()
            .filter(|b| !b.is_empty());

        let remote_head = self
            .run(&["symbolic-ref", "refs/remotes/origin/HEAD"])
            .await
            .ok()
            .and_then(|r| branch_from_remote_ref(&r));

        let mut local = Vec::new();
        for branch in CONVENTIONAL_BRANCHES {
            let reference = format!("refs/heads/{branch}");
            if self
                .succeeds(&["show-ref", "--verify", "--quiet", &reference])
                .await
            {
                local.push(branch.to_string());
            }
        }

        BranchProbe {
            current,
            remote_head,
            local,
        }
    }

    /// Resolve the branch pushes should target.
    pub async fn default_branch(&self) -> String {
        resolve_default_branch(&self.probe_default_branch().await)
    }
}

fn branch_from_remote_ref(reference: &str) -> Option<String> {
    let branch = reference
        .strip_prefix("refs/remotes/origin/")
        .or_else(|| reference.rsplit('/').next())?;
    (!branch.is_empty()).then(|| branch.to_string())
}

/// Observed branch state of a fresh clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchProbe {
    /// `git branch --show-current`, `None` when detached or empty.
    pub current: Option<String>,
    /// Branch named by `refs/remotes/origin/HEAD`.
    pub remote_head: Option<String>,
    /// Which of [`CONVENTIONAL_BRANCHES`] exist locally.
    pub local: Vec<String>,
}

/// Current branch, then remote HEAD, then the first existing of
/// `main`/`master`, then [`FALLBACK_BRANCH`].
pub fn resolve_default_branch(probe: &BranchProbe) -> String {
    if let Some(current) = &probe.current {
        return current.clone();
    }
    if let Some(remote_head) = &probe.remote_head {
        return remote_head.clone();
    }
    CONVENTIONAL_BRANCHES
        .iter()
        .find(|b| probe.local.iter().any(|l| l == *b))
        .map(|b| b.to_string())
        .unwrap_or_else(|| FALLBACK_BRANCH.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::process::Command as StdCommand;

    fn run_git(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_git_repo(branch: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init", &format!("--initial-branch={branch}")]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["commit", "--allow-empty", "-m", "initial"]);
        dir
    }

    fn probe(current: Option<&str>, remote_head: Option<&str>, local: &[&str]) -> BranchProbe {
        BranchProbe {
            current: current.map(String::from),
            remote_head: remote_head.map(String::from),
            local: local.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_current_branch_wins_over_remote_head() {
        let p = probe(Some("develop"), Some("main"), &["main", "master"]);
        assert_eq!(resolve_default_branch(&p), "develop");
    }

    #[test]
    fn test_remote_head_wins_over_conventional_names() {
        let p = probe(None, Some("trunk"), &["main", "master"]);
        assert_eq!(resolve_default_branch(&p), "trunk");
    }

    #[test]
    fn test_main_preferred_over_master() {
        assert_eq!(resolve_default_branch(&probe(None, None, &["master", "main"])), "main");
        assert_eq!(resolve_default_branch(&probe(None, None, &["master"])), "master");
    }

    #[test]
    fn test_literal_fallback() {
        assert_eq!(resolve_default_branch(&BranchProbe::default()), FALLBACK_BRANCH);
    }

    #[test]
    fn test_branch_from_remote_ref() {
        assert_eq!(
            branch_from_remote_ref("refs/remotes/origin/release/v2"),
            Some("release/v2".to_string())
        );
        assert_eq!(branch_from_remote_ref("refs/remotes/upstream/main"), Some("main".to_string()));
        assert_eq!(branch_from_remote_ref("refs/remotes/origin/"), None);
    }

    #[test]
    fn test_redact_scrubs_secret() {
        let text = "fatal: could not read from https://ghp_abc@github.com/o/r.git";
        assert_eq!(
            redact(text, Some("ghp_abc")),
            "fatal: could not read from https://***@github.com/o/r.git"
        );
        assert_eq!(redact(text, Some("")), text);
        assert_eq!(redact(text, None), text);
    }

    #[test]
    fn test_subcommand_skips_config_pairs() {
        assert_eq!(subcommand(&["-c", "user.name=x", "commit", "-m", "m"]), "commit");
        assert_eq!(subcommand(&["push", "origin", "main"]), "push");
        assert_eq!(subcommand(&[]), "");
    }

    #[tokio::test]
    async fn test_default_branch_uses_checked_out_branch() {
        let repo = make_git_repo("trunk");
        assert_eq!(Git::new(repo.path()).default_branch().await, "trunk");
    }

    #[tokio::test]
    async fn test_default_branch_detached_falls_back_to_local_master() {
        let repo = make_git_repo("master");
        run_git(repo.path(), &["checkout", "--detach"]);

        let probe = Git::new(repo.path()).probe_default_branch().await;
        assert_eq!(probe.current, None);
        assert_eq!(probe.remote_head, None);
        assert_eq!(probe.local, vec!["master".to_string()]);
        assert_eq!(resolve_default_branch(&probe), "master");
    }

    #[tokio::test]
    async fn test_has_staged_changes() {
        let repo = make_git_repo("main");
        let git = Git::new(repo.path());
        assert!(!git.has_staged_changes().await.unwrap());

        std::fs::write(repo.path().join("ci.yml"), "on: push\n").unwrap();
        git.run(&["add", "ci.yml"]).await.unwrap();
        assert!(git.has_staged_changes().await.unwrap());
    }

    #[tokio::test]
    async fn test_run_failure_is_redacted() {
        let dir = tempfile::tempdir().unwrap();
        let err = Git::new(dir.path())
            .redacting(Some("s3cr3t"))
            .run(&["clone", "/nonexistent/s3cr3t/repo.git", "out"])
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("git clone failed"), "got: {msg}");
        assert!(!msg.contains("s3cr3t"), "secret leaked: {msg}");
    }
}
