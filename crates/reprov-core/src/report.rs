//! Per-repository results and the end-of-run summary.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message recorded when the existence check fails.
pub const NOT_ACCESSIBLE: &str = "Repository not found or not accessible";

const RULE: &str = "============================================================";

/// Terminal state of one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Reachable and every attempted stage succeeded.
    Success,
    /// Reachable but at least one stage failed.
    Partial,
    /// Unreachable or unparsable; no stage was attempted.
    Error,
}

impl ProcessingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingStatus::Success => "SUCCESS",
            ProcessingStatus::Partial => "PARTIAL",
            ProcessingStatus::Error => "ERROR",
        }
    }
}

/// Outcome of processing one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Repository URL as configured.
    pub repository: String,
    pub status: ProcessingStatus,
    pub workflows_pushed: bool,
    pub secrets_added: BTreeMap<String, bool>,
    pub permissions_updated: bool,
    pub errors: Vec<String>,
}

impl ProcessingResult {
    /// A reachable repository before any stage has run.
    pub fn reachable(repository: &str) -> Self {
        ProcessingResult {
            repository: repository.to_string(),
            status: ProcessingStatus::Success,
            workflows_pushed: false,
            secrets_added: BTreeMap::new(),
            permissions_updated: false,
            errors: Vec::new(),
        }
    }

    /// A repository that failed before any stage was attempted.
    pub fn error(repository: &str, message: impl Into<String>) -> Self {
        ProcessingResult {
            status: ProcessingStatus::Error,
            errors: vec![message.into()],
            ..Self::reachable(repository)
        }
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Settle the status of a reachable repository from its recorded errors.
    pub fn finish(mut self) -> Self {
        if self.status != ProcessingStatus::Error {
            self.status = if self.errors.is_empty() {
                ProcessingStatus::Success
            } else {
                ProcessingStatus::Partial
            };
        }
        self
    }

    /// Last path segment of the configured URL.
    pub fn display_name(&self) -> &str {
        let trimmed = self.repository.trim_end_matches('/');
        let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
        last.strip_suffix(".git").unwrap_or(last)
    }

    pub fn secrets_added_count(&self) -> usize {
        self.secrets_added.values().filter(|added| **added).count()
    }
}

/// Serializable summary of a whole run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    pub results: Vec<ProcessingResult>,
}

impl RunSummary {
    pub fn new(results: Vec<ProcessingResult>) -> Self {
        let count = |status: ProcessingStatus| results.iter().filter(|r| r.status == status).count();
        RunSummary {
            generated_at: Utc::now(),
            total: results.len(),
            succeeded: count(ProcessingStatus::Success),
            partial: count(ProcessingStatus::Partial),
            failed: count(ProcessingStatus::Error),
            results,
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Render the human-readable end-of-run summary.
pub fn render_summary(results: &[ProcessingResult]) -> String {
    let succeeded = results
        .iter()
        .filter(|r| r.status == ProcessingStatus::Success)
        .count();

    let mut out = String::new();
    out.push_str(RULE);
    out.push_str("\nAUTOMATION SUMMARY\n");
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!(
        "Successfully processed: {}/{} repositories\n",
        succeeded,
        results.len()
    ));

    for result in results {
        out.push_str(&format!(
            "\n[{}] {}\n",
            result.status.label(),
            result.display_name()
        ));

        if result.status == ProcessingStatus::Error {
            out.push_str(&format!("   Error: {}\n", result.errors.join(", ")));
            continue;
        }

        out.push_str(&format!(
            "   Workflows: {}\n",
            yes_no(result.workflows_pushed)
        ));
        out.push_str(&format!(
            "   Secrets: {}/{} added\n",
            result.secrets_added_count(),
            result.secrets_added.len()
        ));
        out.push_str(&format!(
            "   Workflow Permissions: {}\n",
            yes_no(result.permissions_updated)
        ));
        if !result.errors.is_empty() {
            out.push_str(&format!("   Errors: {}\n", result.errors.join(", ")));
        }
    }

    out
}

/// Write the run summary as pretty JSON.
pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<()> {
    let content = serde_json::to_string_pretty(summary).context("serialize run summary")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
