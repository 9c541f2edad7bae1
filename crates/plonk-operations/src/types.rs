use std::collections::BTreeMap;
use std::path::PathBuf;

use plonk_core::{Domain, OperationResult, ReconcileResult, Summary};

/// What `apply` operates on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ApplyScope {
    #[default]
    All,
    Packages,
    Dotfiles,
    /// Only the named dotfiles (source-relative names).
    Files(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub dry_run: bool,
    pub scope: ApplyScope,
}

/// Ordered per-item results plus the aggregate summary.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub results: Vec<OperationResult>,
    pub summary: Summary,
}

impl ApplyReport {
    pub fn from_results(results: Vec<OperationResult>) -> Self {
        let summary = Summary::from_results(&results);
        Self { results, summary }
    }

    pub fn exit_code(&self) -> i32 {
        self.summary.exit_code(&self.results)
    }
}

/// Cross-domain reconciliation outcome.
///
/// A failing domain lands in `errors` without blocking the other domain.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub results: BTreeMap<Domain, ReconcileResult>,
    pub errors: Vec<(Domain, String)>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UninstallOptions {
    pub dry_run: bool,
}

/// One drifted dotfile's external diff.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub name: String,
    pub target: PathBuf,
    pub source: PathBuf,
    pub output: String,
}
