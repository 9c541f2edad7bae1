//! Per-item operation outcomes and batch summaries.

use std::collections::BTreeMap;

use serde::Serialize;

/// Outcome of one apply/install/uninstall/upgrade/add/rm item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationStatus {
    Added,
    Updated,
    Removed,
    Unlinked,
    Skipped,
    Failed,
    WouldInstall,
    WouldRemove,
    WouldUpdate,
}

impl OperationStatus {
    /// Whether this status counts as progress for the exit-code policy.
    pub fn is_progress(self) -> bool {
        matches!(
            self,
            Self::Added | Self::Updated | Self::Removed | Self::Unlinked
        )
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Removed => "removed",
            Self::Unlinked => "unlinked",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::WouldInstall => "would-install",
            Self::WouldRemove => "would-remove",
            Self::WouldUpdate => "would-update",
        };
        f.write_str(name)
    }
}

/// Record of one processed item.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl OperationResult {
    pub fn new(name: &str, status: OperationStatus) -> Self {
        Self {
            name: name.to_string(),
            manager: None,
            status,
            version: None,
            error: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_manager(mut self, manager: &str) -> Self {
        self.manager = Some(manager.to_string());
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn failed(name: &str, error: impl std::fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(name, OperationStatus::Failed)
        }
    }
}

/// Aggregate counts over a batch of operation results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unlinked: usize,
    pub skipped: usize,
    pub failed: usize,
    pub files_processed: usize,
}

impl Summary {
    pub fn from_results(results: &[OperationResult]) -> Self {
        let mut summary = Self {
            files_processed: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.status {
                OperationStatus::Added | OperationStatus::WouldInstall => summary.added += 1,
                OperationStatus::Updated | OperationStatus::WouldUpdate => summary.updated += 1,
                OperationStatus::Removed | OperationStatus::WouldRemove => summary.removed += 1,
                OperationStatus::Unlinked => summary.unlinked += 1,
                OperationStatus::Skipped => summary.skipped += 1,
                OperationStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }

    /// Exit-code policy: 0 when any item made progress or every item was
    /// skipped; 1 when all items failed. Configuration errors exit earlier
    /// with code 2, before a batch runs.
    pub fn exit_code(&self, results: &[OperationResult]) -> i32 {
        let progressed = results.iter().filter(|r| r.status.is_progress()).count();
        if progressed > 0 {
            return 0;
        }
        if !results.is_empty() && self.failed == results.len() {
            return 1;
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let results = vec![
            OperationResult::new("jq", OperationStatus::Added),
            OperationResult::new("wget", OperationStatus::Updated),
            OperationResult::new("zshrc", OperationStatus::Unlinked),
            OperationResult::failed("nope", "boom"),
            OperationResult::new("fzf", OperationStatus::Skipped),
        ];
        let summary = Summary::from_results(&results);
        assert_eq!(summary.added, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.unlinked, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.files_processed, 5);
    }

    #[test]
    fn test_exit_code_progress_wins() {
        let results = vec![
            OperationResult::new("jq", OperationStatus::Added),
            OperationResult::failed("nope", "boom"),
        ];
        assert_eq!(Summary::from_results(&results).exit_code(&results), 0);
    }

    #[test]
    fn test_exit_code_all_failed() {
        let results = vec![
            OperationResult::failed("a", "boom"),
            OperationResult::failed("b", "boom"),
        ];
        assert_eq!(Summary::from_results(&results).exit_code(&results), 1);
    }

    #[test]
    fn test_exit_code_all_skipped() {
        let results = vec![OperationResult::new("jq", OperationStatus::Skipped)];
        assert_eq!(Summary::from_results(&results).exit_code(&results), 0);
    }

    #[test]
    fn test_exit_code_empty_batch() {
        let results: Vec<OperationResult> = Vec::new();
        assert_eq!(Summary::from_results(&results).exit_code(&results), 0);
    }

    #[test]
    fn test_dry_run_statuses_are_not_progress() {
        assert!(!OperationStatus::WouldInstall.is_progress());
        assert!(!OperationStatus::WouldRemove.is_progress());
        assert!(OperationStatus::Added.is_progress());
    }
}
