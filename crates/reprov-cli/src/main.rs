//! reprov - provision GitHub repositories in bulk
//!
//! For every configured repository, in order:
//!
//! - push the local workflow files to the default branch
//! - upload the configured Actions secrets (sealed with the repo public key)
//! - set Actions permissions to read/write with PR approval

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{warn, Level};

use reprov_core::{
    is_valid_secret_name, missing_secrets, render_summary, write_summary_json, CommitIdentity,
    GitHubClient, GitHubConfig, GitRemote, GitWorkflowPusher, Provisioner, RunSummary,
    SecretSpec, DEFAULT_API_BASE, DEFAULT_GIT_HOST, DEFAULT_SECRET_NAMES,
};

#[derive(Parser, Debug)]
#[command(name = "reprov")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Push workflows, secrets and Actions permissions to GitHub repositories", long_about = None)]
struct Cli {
    /// Repository URLs (https://github.com/owner/name or git@github.com:owner/name)
    repos: Vec<String>,

    /// File with one repository URL per line (`#` starts a comment)
    #[arg(long)]
    repos_file: Option<PathBuf>,

    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory holding the workflow files to push
    #[arg(long, env = "REPROV_WORKFLOWS_DIR", default_value = ".github/workflows")]
    workflows_dir: PathBuf,

    /// Secret to provision; its value is read from the environment variable of the same name
    #[arg(long = "secret", value_name = "NAME")]
    secrets: Vec<String>,

    /// Seconds to wait between repositories
    #[arg(long, default_value_t = 2)]
    delay_secs: u64,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Git host used for credentialed clones and accepted in repository URLs
    #[arg(long, default_value = DEFAULT_GIT_HOST)]
    git_host: String,

    /// Commit author name (defaults to git configuration)
    #[arg(long, requires = "git_user_email")]
    git_user_name: Option<String>,

    /// Commit author email (defaults to git configuration)
    #[arg(long, requires = "git_user_name")]
    git_user_email: Option<String>,

    /// Also write the summary as JSON to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

/// Parse a repository list: one URL per line, blank lines and `#` comments skipped.
fn parse_repo_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

fn collect_repositories(cli: &Cli) -> Result<Vec<String>> {
    let mut repos = cli.repos.clone();
    if let Some(path) = &cli.repos_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read repository list {:?}", path))?;
        repos.extend(parse_repo_list(&content));
    }
    Ok(repos)
}

fn secret_specs(names: &[String]) -> Result<Vec<SecretSpec>> {
    if names.is_empty() {
        return Ok(DEFAULT_SECRET_NAMES
            .iter()
            .map(|name| SecretSpec::from_env(name))
            .collect());
    }
    if let Some(bad) = names.iter().find(|name| !is_valid_secret_name(name)) {
        bail!("Invalid secret name {:?}; use letters, digits and underscores", bad);
    }
    Ok(names.iter().map(|name| SecretSpec::from_env(name)).collect())
}

fn require_token(token: Option<&str>) -> Result<&str> {
    match token.map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => bail!("GITHUB_TOKEN environment variable not set; export GITHUB_TOKEN=<your token>"),
    }
}

/// Write the JSON summary; a failure is reported but does not fail the run.
fn export_summary(path: &Path, summary: &RunSummary) -> bool {
    match write_summary_json(path, summary) {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not write summary to {:?}: {:#}", path, e);
            false
        }
    }
}

fn require_workflows_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("Workflows directory {:?} not found", dir);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    reprov_core::init_tracing(cli.json, level);

    let token = require_token(cli.token.as_deref())?;
    require_workflows_dir(&cli.workflows_dir)?;

    let repositories = collect_repositories(&cli)?;
    if repositories.is_empty() {
        bail!("No repositories given; pass URLs as arguments or use --repos-file");
    }

    let secrets = secret_specs(&cli.secrets)?;
    let missing = missing_secrets(&secrets);
    if !missing.is_empty() {
        warn!(
            "Missing environment variables: {}. These secrets will be skipped.",
            missing.join(", ")
        );
    }

    let api = GitHubClient::new(GitHubConfig::new(token).with_api_base(&cli.api_base))
        .context("Failed to create GitHub client")?;

    let remote = GitRemote::Https {
        host: cli.git_host.clone(),
        token: token.to_string(),
    };
    let mut pusher = GitWorkflowPusher::new(cli.workflows_dir.clone(), remote);
    if let (Some(name), Some(email)) = (&cli.git_user_name, &cli.git_user_email) {
        pusher = pusher.with_identity(CommitIdentity {
            name: name.clone(),
            email: email.clone(),
        });
    }

    let provisioner = Provisioner::new(Arc::new(api), Arc::new(pusher), secrets)
        .with_delay(Duration::from_secs(cli.delay_secs))
        .with_git_host(cli.git_host.clone());

    let results = provisioner.run(&repositories).await;

    println!();
    print!("{}", render_summary(&results));

    if let Some(path) = &cli.summary_json {
        if export_summary(path, &RunSummary::new(results)) {
            println!("\nSummary written to {:?}", path);
        }
    }

    println!("\nAutomation completed!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_repo_list_skips_comments_and_blanks() {
        let content = "\
https://github.com/o/a
# https://github.com/o/disabled

  git@github.com:o/b.git   # trailing comment
";
        assert_eq!(
            parse_repo_list(content),
            vec![
                "https://github.com/o/a".to_string(),
                "git@github.com:o/b.git".to_string()
            ]
        );
    }

    #[test]
    fn test_require_token() {
        assert!(require_token(None).is_err());
        assert!(require_token(Some("  ")).is_err());
        assert_eq!(require_token(Some("ghp_x")).unwrap(), "ghp_x");
    }

    #[test]
    fn test_require_workflows_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(require_workflows_dir(dir.path()).is_ok());
        assert!(require_workflows_dir(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_secret_specs_default_names() {
        let specs = secret_specs(&[]).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, DEFAULT_SECRET_NAMES.to_vec());
    }

    #[test]
    fn test_secret_specs_explicit_names() {
        let specs = secret_specs(&["DEPLOY_KEY".to_string()]).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "DEPLOY_KEY");
    }

    #[test]
    fn test_secret_specs_reject_path_like_names() {
        for name in ["A/B", "A?x", "A#B", ""] {
            assert!(secret_specs(&[name.to_string()]).is_err(), "{name:?}");
        }
    }

    #[test]
    fn test_export_summary_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let summary = RunSummary::new(Vec::new());

        let unwritable = dir.path().join("missing-dir").join("summary.json");
        assert!(!export_summary(&unwritable, &summary));

        let path = dir.path().join("summary.json");
        assert!(export_summary(&path, &summary));
        assert!(path.exists());
    }

    #[test]
    fn test_git_host_defaults_to_github() {
        let cli = Cli::parse_from(["reprov", "https://github.com/o/r"]);
        assert_eq!(cli.git_host, DEFAULT_GIT_HOST);

        let cli = Cli::parse_from(["reprov", "--git-host", "ghe.example.com", "x"]);
        assert_eq!(cli.git_host, "ghe.example.com");
    }

    #[test]
    fn test_collect_repositories_merges_args_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("repos.txt");
        std::fs::write(&list, "https://github.com/o/from-file\n").unwrap();

        let cli = Cli::parse_from([
            "reprov",
            "https://github.com/o/from-arg",
            "--repos-file",
            list.to_str().unwrap(),
        ]);
        assert_eq!(
            collect_repositories(&cli).unwrap(),
            vec![
                "https://github.com/o/from-arg".to_string(),
                "https://github.com/o/from-file".to_string()
            ]
        );
    }
}
