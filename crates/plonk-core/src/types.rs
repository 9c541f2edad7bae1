//! The reconciliation data model.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

/// Resource domains plonk reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Package,
    Dotfile,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Package => f.write_str("package"),
            Self::Dotfile => f.write_str("dotfile"),
        }
    }
}

/// How one resource compares between declared and observed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconciliationState {
    /// Declared and observed, content matching.
    Managed,
    /// Declared but not observed.
    Missing,
    /// Declared and observed, content differing. Dotfiles only.
    Drifted,
    /// Observed but not declared.
    Untracked,
}

impl std::fmt::Display for ReconciliationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Managed => f.write_str("managed"),
            Self::Missing => f.write_str("missing"),
            Self::Drifted => f.write_str("drifted"),
            Self::Untracked => f.write_str("untracked"),
        }
    }
}

/// One reconciled resource. Immutable once produced by a reconciler.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub name: String,
    pub state: ReconciliationState,
    pub domain: Domain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Item {
    pub fn package(manager: &str, name: &str, state: ReconciliationState) -> Self {
        Self {
            name: name.to_string(),
            state,
            domain: Domain::Package,
            manager: Some(manager.to_string()),
            path: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn dotfile(name: &str, target: PathBuf, state: ReconciliationState) -> Self {
        Self {
            name: name.to_string(),
            state,
            domain: Domain::Dotfile,
            manager: None,
            path: Some(target),
            metadata: BTreeMap::new(),
        }
    }

    /// Identity within the domain: `manager:name` for packages, the
    /// source-relative path for dotfiles.
    pub fn key(&self) -> String {
        match &self.manager {
            Some(manager) => format!("{manager}:{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Per-domain reconciliation outcome.
///
/// Invariant: every item's `state` matches the list holding it, and lists
/// are sorted by `(manager, name)` for packages, `name` for dotfiles.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResult {
    pub domain: Domain,
    pub managed: Vec<Item>,
    pub missing: Vec<Item>,
    pub untracked: Vec<Item>,
    pub drifted: Vec<Item>,
}

impl ReconcileResult {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            managed: Vec::new(),
            missing: Vec::new(),
            untracked: Vec::new(),
            drifted: Vec::new(),
        }
    }

    pub fn push(&mut self, item: Item) {
        debug_assert_eq!(item.domain, self.domain);
        match item.state {
            ReconciliationState::Managed => self.managed.push(item),
            ReconciliationState::Missing => self.missing.push(item),
            ReconciliationState::Drifted => self.drifted.push(item),
            ReconciliationState::Untracked => self.untracked.push(item),
        }
    }

    /// Sorts every list by `(manager, name)`.
    pub fn sort(&mut self) {
        let by_identity = |a: &Item, b: &Item| (&a.manager, &a.name).cmp(&(&b.manager, &b.name));
        self.managed.sort_by(by_identity);
        self.missing.sort_by(by_identity);
        self.untracked.sort_by(by_identity);
        self.drifted.sort_by(by_identity);
    }

    pub fn is_empty(&self) -> bool {
        self.managed.is_empty()
            && self.missing.is_empty()
            && self.untracked.is_empty()
            && self.drifted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.managed.len() + self.missing.len() + self.untracked.len() + self.drifted.len()
    }
}

/// Status record for one dotfile, as shown by `plonk status`.
#[derive(Debug, Clone, Serialize)]
pub struct DotfileStatus {
    /// Source-relative name, e.g. `config/nvim/init.lua`.
    pub name: String,
    /// Absolute path of the source inside the plonk directory.
    pub source: PathBuf,
    /// Absolute destination inside `$HOME`.
    pub target: PathBuf,
    pub state: ReconciliationState,
}
