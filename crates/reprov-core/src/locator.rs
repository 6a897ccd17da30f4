//! Repository URL parsing.

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};

/// Host accepted by [`parse_repository_url`].
pub const DEFAULT_GIT_HOST: &str = "github.com";

/// An `owner/name` pair identifying a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryTarget {
    pub owner: String,
    pub name: String,
}

impl RepositoryTarget {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepositoryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl std::str::FromStr for RepositoryTarget {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        parse_repository_url(s)
    }
}

/// Parse an HTTPS (`https://github.com/owner/name`) or SSH
/// (`git@github.com:owner/name`) URL, with or without a `.git` suffix.
pub fn parse_repository_url(url: &str) -> Result<RepositoryTarget> {
    parse_repository_url_for(url, DEFAULT_GIT_HOST)
}

/// Like [`parse_repository_url`], for repositories served from `host`
/// (e.g. a GitHub Enterprise Server). URLs on any other host are rejected.
pub fn parse_repository_url_for(url: &str, host: &str) -> Result<RepositoryTarget> {
    let invalid = || ProvisionError::InvalidReference(url.to_string());

    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(invalid());
    }
    let https_prefix = format!("https://{host}/");
    let ssh_prefix = format!("git@{host}:");

    let trimmed = url.strip_suffix(".git").unwrap_or(url);
    let path = trimmed
        .strip_prefix(https_prefix.as_str())
        .or_else(|| trimmed.strip_prefix(ssh_prefix.as_str()))
        .ok_or_else(invalid)?;

    let parts: Vec<&str> = path.split('/').collect();
    match parts.as_slice() {
        [owner, name] if !owner.is_empty() && !name.is_empty() => {
            Ok(RepositoryTarget::new(*owner, *name))
        }
        _ => Err(invalid()),
    }
}
