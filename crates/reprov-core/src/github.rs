//! GitHub REST API client.
//!
//! [`HostingApi`] is the seam the pipeline talks to; [`GitHubClient`] is the
//! reqwest-backed implementation. Tests plug in in-memory fakes.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProvisionError, Result};
use crate::locator::RepositoryTarget;
use crate::permissions::ActionsPermissions;

/// Default public API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

/// Public key used to seal Actions secrets for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionsPublicKey {
    pub key_id: String,
    /// Base64-encoded X25519 public key.
    pub key: String,
}

/// Request body for creating or updating an Actions secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    pub encrypted_value: String,
    pub key_id: String,
}

/// Operations reprov needs from the hosting platform.
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// `true` when the repository metadata is readable with the current token.
    async fn repository_exists(&self, repo: &RepositoryTarget) -> Result<bool>;

    /// Fetch the repository's current Actions public key.
    async fn actions_public_key(&self, repo: &RepositoryTarget) -> Result<ActionsPublicKey>;

    /// Create or update the Actions secret `name`.
    async fn put_actions_secret(
        &self,
        repo: &RepositoryTarget,
        name: &str,
        secret: &EncryptedSecret,
    ) -> Result<()>;

    /// Replace the repository's Actions permission policy.
    async fn update_actions_permissions(
        &self,
        repo: &RepositoryTarget,
        permissions: &ActionsPermissions,
    ) -> Result<()>;
}

/// GitHub client configuration.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// API base URL, without trailing slash.
    pub api_base: String,
    /// Personal access token.
    pub token: String,
}

impl GitHubConfig {
    pub fn new(token: &str) -> Self {
        GitHubConfig {
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.to_string(),
        }
    }

    /// Point the client at another API base (GitHub Enterprise, local stubs).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }
}

/// reqwest-backed [`HostingApi`].
pub struct GitHubClient {
    config: GitHubConfig,
    http_client: reqwest::Client,
}

impl GitHubClient {
    /// Create a new client with the token installed as a default header.
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|e| ProvisionError::Http(format!("invalid token header: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("reprov/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(GitHubClient {
            config,
            http_client,
        })
    }

    fn repo_url(&self, repo: &RepositoryTarget, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.config.api_base, repo.owner, repo.name, suffix
        )
    }
}

/// Accept `response` when its status is one of `accepted`.
async fn expect_status(response: Response, accepted: &[StatusCode]) -> Result<()> {
    let status = response.status();
    if accepted.contains(&status) {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProvisionError::UnexpectedStatus {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn repository_exists(&self, repo: &RepositoryTarget) -> Result<bool> {
        let response = self.http_client.get(self.repo_url(repo, "")).send().await?;
        let status = response.status();
        debug!(repo = %repo, status = status.as_u16(), "repository lookup");
        Ok(status == StatusCode::OK)
    }

    async fn actions_public_key(&self, repo: &RepositoryTarget) -> Result<ActionsPublicKey> {
        let response = self
            .http_client
            .get(self.repo_url(repo, "/actions/secrets/public-key"))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ProvisionError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn put_actions_secret(
        &self,
        repo: &RepositoryTarget,
        name: &str,
        secret: &EncryptedSecret,
    ) -> Result<()> {
        let response = self
            .http_client
            .put(self.repo_url(repo, &format!("/actions/secrets/{name}")))
            .json(secret)
            .send()
            .await?;
        debug!(repo = %repo, secret = name, status = response.status().as_u16(), "secret upsert");
        expect_status(response, &[StatusCode::CREATED, StatusCode::NO_CONTENT]).await
    }

    async fn update_actions_permissions(
        &self,
        repo: &RepositoryTarget,
        permissions: &ActionsPermissions,
    ) -> Result<()> {
        let response = self
            .http_client
            .put(self.repo_url(repo, "/actions/permissions"))
            .json(permissions)
            .send()
            .await?;
        debug!(repo = %repo, status = response.status().as_u16(), "permissions update");
        expect_status(response, &[StatusCode::OK, StatusCode::NO_CONTENT]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_config_new_uses_public_api() {
        let config = GitHubConfig::new("ghp_test");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.token, "ghp_test");
    }

    #[test]
    fn test_with_api_base_trims_trailing_slash() {
        let config = GitHubConfig::new("t").with_api_base("https://ghe.example.com/api/v3/");
        assert_eq!(config.api_base, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_repo_url_layout() {
        let client = GitHubClient::new(GitHubConfig::new("t")).unwrap();
        let repo = RepositoryTarget::new("octo", "widgets");
        assert_eq!(
            client.repo_url(&repo, "/actions/permissions"),
            "https://api.github.com/repos/octo/widgets/actions/permissions"
        );
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        let result = GitHubClient::new(GitHubConfig::new("bad\ntoken"));
        assert!(matches!(result, Err(ProvisionError::Http(_))));
    }

    #[test]
    fn test_encrypted_secret_body_shape() {
        let body = serde_json::to_value(EncryptedSecret {
            encrypted_value: "c2VhbGVk".to_string(),
            key_id: "568250167242549743".to_string(),
        })
        .unwrap();
        assert_eq!(body["encrypted_value"], "c2VhbGVk");
        assert_eq!(body["key_id"], "568250167242549743");
    }
}
