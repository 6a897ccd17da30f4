//! Actions secret provisioning.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ProvisionError, Result};
use crate::github::{EncryptedSecret, HostingApi};
use crate::locator::RepositoryTarget;
use crate::sealing::seal_secret;

/// Secret names provisioned when none are configured explicitly.
pub const DEFAULT_SECRET_NAMES: [&str; 4] = [
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_REGION",
    "AWS_BEDROCK_MODEL_ID",
];

/// A named secret and its configured value, if any.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretSpec {
    pub name: String,
    pub value: Option<String>,
}

// Values stay out of logs.
impl std::fmt::Debug for SecretSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretSpec")
            .field("name", &self.name)
            .field("value", &self.value.as_ref().map(|_| "***"))
            .finish()
    }
}

impl SecretSpec {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        SecretSpec {
            name: name.into(),
            value,
        }
    }

    /// Read the value of the environment variable named `name`.
    pub fn from_env(name: &str) -> Self {
        Self::new(name, std::env::var(name).ok())
    }

    /// The value to upload, or `None` when it is missing or empty.
    pub fn provided_value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }
}

/// Can `name` be used as an Actions secret name (and URL path segment)?
pub fn is_valid_secret_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Names of secrets that will be skipped for lack of a value.
pub fn missing_secrets(specs: &[SecretSpec]) -> Vec<&str> {
    specs
        .iter()
        .filter(|s| s.provided_value().is_none())
        .map(|s| s.name.as_str())
        .collect()
}

/// What happened to one secret in one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum SecretOutcome {
    Added,
    /// No value configured; nothing was sent.
    Skipped,
    Failed(String),
}

impl SecretOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, SecretOutcome::Added)
    }
}

/// Seals and uploads secrets through a [`HostingApi`].
pub struct SecretProvisioner<'a> {
    api: &'a dyn HostingApi,
}

impl<'a> SecretProvisioner<'a> {
    pub fn new(api: &'a dyn HostingApi) -> Self {
        SecretProvisioner { api }
    }

    /// Fetch the current key, seal, and upsert one secret.
    pub async fn upload(&self, repo: &RepositoryTarget, name: &str, value: &str) -> Result<()> {
        if !is_valid_secret_name(name) {
            return Err(ProvisionError::InvalidSecretName(name.to_string()));
        }
        let key = self.api.actions_public_key(repo).await?;
        let encrypted_value = seal_secret(&key.key, value)?;
        let body = EncryptedSecret {
            encrypted_value,
            key_id: key.key_id,
        };
        self.api.put_actions_secret(repo, name, &body).await
    }

    /// Provision `spec`; failures are returned as [`SecretOutcome::Failed`].
    pub async fn provision(&self, repo: &RepositoryTarget, spec: &SecretSpec) -> SecretOutcome {
        let Some(value) = spec.provided_value() else {
            warn!(repo = %repo, secret = %spec.name, "skipping secret (value not found in environment)");
            return SecretOutcome::Skipped;
        };

        match self.upload(repo, &spec.name, value).await {
            Ok(()) => {
                info!(repo = %repo, secret = %spec.name, "secret set");
                SecretOutcome::Added
            }
            Err(e) => {
                warn!(repo = %repo, secret = %spec.name, error = %e, "failed to set secret");
                SecretOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provided_value_treats_empty_as_missing() {
        assert_eq!(SecretSpec::new("A", Some("x".into())).provided_value(), Some("x"));
        assert_eq!(SecretSpec::new("A", Some(String::new())).provided_value(), None);
        assert_eq!(SecretSpec::new("A", None).provided_value(), None);
    }

    #[test]
    fn test_missing_secrets_lists_names_in_order() {
        let specs = vec![
            SecretSpec::new("AWS_REGION", None),
            SecretSpec::new("AWS_ACCESS_KEY_ID", Some("id".into())),
            SecretSpec::new("AWS_BEDROCK_MODEL_ID", Some(String::new())),
        ];
        assert_eq!(missing_secrets(&specs), vec!["AWS_REGION", "AWS_BEDROCK_MODEL_ID"]);
    }

    #[test]
    fn test_debug_hides_value() {
        let spec = SecretSpec::new("AWS_SECRET_ACCESS_KEY", Some("hunter2".into()));
        let rendered = format!("{spec:?}");
        assert!(rendered.contains("AWS_SECRET_ACCESS_KEY"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_from_env_reads_variable() {
        std::env::set_var("REPROV_TEST_SECRET_FROM_ENV", "value-1");
        let spec = SecretSpec::from_env("REPROV_TEST_SECRET_FROM_ENV");
        assert_eq!(spec.provided_value(), Some("value-1"));

        let absent = SecretSpec::from_env("REPROV_TEST_SECRET_DEFINITELY_UNSET");
        assert_eq!(absent.value, None);
    }

    #[test]
    fn test_secret_name_validation() {
        for name in ["AWS_REGION", "_PRIVATE", "token2"] {
            assert!(is_valid_secret_name(name), "{name} should be valid");
        }
        for name in ["", "2FA", "A/B", "A?x=1", "A#B", "A-B", "A B", "ÄWS"] {
            assert!(!is_valid_secret_name(name), "{name:?} should be invalid");
        }
    }

    #[test]
    fn test_outcome_wire_format() {
        let failed = serde_json::to_value(SecretOutcome::Failed("422".into())).unwrap();
        assert_eq!(failed["outcome"], "failed");
        assert_eq!(failed["reason"], "422");
        assert!(SecretOutcome::Added.is_added());
        assert!(!SecretOutcome::Skipped.is_added());
    }
}
