//! Actions permission policy.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::github::HostingApi;
use crate::locator::RepositoryTarget;

/// Default token permission granted to workflow runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPermission {
    Read,
    Write,
}

/// Body of `PUT /repos/{owner}/{repo}/actions/permissions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionsPermissions {
    pub enabled: bool,
    pub default_workflow_permissions: WorkflowPermission,
    pub can_approve_pull_request_reviews: bool,
}

impl ActionsPermissions {
    /// Actions enabled, read/write token, workflows may approve pull requests.
    pub fn read_write_with_pr_approval() -> Self {
        ActionsPermissions {
            enabled: true,
            default_workflow_permissions: WorkflowPermission::Write,
            can_approve_pull_request_reviews: true,
        }
    }
}

impl Default for ActionsPermissions {
    fn default() -> Self {
        Self::read_write_with_pr_approval()
    }
}

/// Apply the read/write + PR-approval policy to `repo`.
pub async fn update_permissions(api: &dyn HostingApi, repo: &RepositoryTarget) -> Result<()> {
    api.update_actions_permissions(repo, &ActionsPermissions::read_write_with_pr_approval())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_policy_wire_format() {
        let body = serde_json::to_value(ActionsPermissions::default()).unwrap();
        assert_eq!(
            body,
            json!({
                "enabled": true,
                "default_workflow_permissions": "write",
                "can_approve_pull_request_reviews": true
            })
        );
    }

    #[test]
    fn test_read_permission_serializes_lowercase() {
        let value = serde_json::to_value(WorkflowPermission::Read).unwrap();
        assert_eq!(value, json!("read"));
    }
}
