//! Set algebra between declared and observed resource sets.
//!
//! Reconciliation never mutates anything; it only computes the delta.

use std::collections::BTreeMap;

use crate::types::{Domain, Item, ReconcileResult, ReconciliationState};

/// Reconciles identity-keyed declared and observed sets.
///
/// Every declared key present in `observed` is Managed (or Drifted when
/// `is_drifted` says so); declared keys absent from `observed` are
/// Missing; observed keys absent from `declared` are Untracked. Output
/// lists are deterministically sorted.
pub fn reconcile<F>(
    domain: Domain,
    declared: BTreeMap<String, Item>,
    observed: BTreeMap<String, Item>,
    is_drifted: F,
) -> ReconcileResult
where
    F: Fn(&str) -> bool,
{
    let mut result = ReconcileResult::new(domain);

    for (key, item) in &declared {
        let state = if observed.contains_key(key) {
            if is_drifted(key) {
                ReconciliationState::Drifted
            } else {
                ReconciliationState::Managed
            }
        } else {
            ReconciliationState::Missing
        };
        result.push(Item {
            state,
            ..item.clone()
        });
    }

    for (key, item) in &observed {
        if !declared.contains_key(key) {
            result.push(Item {
                state: ReconciliationState::Untracked,
                ..item.clone()
            });
        }
    }

    result.sort();
    result
}

/// Reconciles the package domain from declared item prototypes (usually
/// built from lock entries, metadata included) and per-manager observed
/// name lists.
///
/// A manager present in the declarations but absent from `observed`
/// contributes an empty observed set, so its packages report Missing
/// rather than failing the reconciliation.
pub fn reconcile_packages(
    declared: Vec<Item>,
    observed: &BTreeMap<String, Vec<String>>,
) -> ReconcileResult {
    let mut declared_map = BTreeMap::new();
    for item in declared {
        declared_map.insert(item.key(), item);
    }

    let mut observed_map = BTreeMap::new();
    for (manager, names) in observed {
        for name in names {
            let item = Item::package(manager, name, ReconciliationState::Untracked);
            observed_map.insert(item.key(), item);
        }
    }

    reconcile(Domain::Package, declared_map, observed_map, |_| false)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn observed(groups: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        groups
            .iter()
            .map(|(manager, names)| {
                (
                    manager.to_string(),
                    names.iter().map(ToString::to_string).collect(),
                )
            })
            .collect()
    }

    fn declared(pairs: &[(&str, &str)]) -> Vec<Item> {
        pairs
            .iter()
            .map(|(manager, name)| Item::package(manager, name, ReconciliationState::Missing))
            .collect()
    }

    #[test]
    fn test_mixed_states_sorted_by_name() {
        let result = reconcile_packages(
            declared(&[("brew", "jq"), ("brew", "wget")]),
            &observed(&[("brew", &["jq", "ripgrep"])]),
        );

        let names = |items: &[Item]| -> Vec<String> { items.iter().map(|i| i.name.clone()).collect() };
        assert_eq!(names(&result.managed), vec!["jq"]);
        assert_eq!(names(&result.missing), vec!["wget"]);
        assert_eq!(names(&result.untracked), vec!["ripgrep"]);
        assert!(result.drifted.is_empty());
    }

    #[test]
    fn test_empty_sets_give_empty_result() {
        let result = reconcile_packages(Vec::new(), &BTreeMap::new());
        assert!(result.is_empty());
    }

    #[test]
    fn test_same_name_different_managers_are_distinct() {
        let result = reconcile_packages(
            declared(&[("brew", "ripgrep")]),
            &observed(&[("cargo", &["ripgrep"])]),
        );
        assert_eq!(result.missing.len(), 1);
        assert_eq!(result.untracked.len(), 1);
        assert_eq!(result.missing[0].manager.as_deref(), Some("brew"));
        assert_eq!(result.untracked[0].manager.as_deref(), Some("cargo"));
    }

    #[test]
    fn test_partition_property() {
        // managed ∪ missing ∪ drifted = declared; untracked = observed ∖ declared
        let declared_items = declared(&[
            ("brew", "a"),
            ("brew", "b"),
            ("npm", "c"),
            ("cargo", "d"),
        ]);
        let declared_keys: BTreeSet<String> = declared_items.iter().map(Item::key).collect();
        let observed_sets = observed(&[
            ("brew", &["a", "x"]),
            ("npm", &["c", "y"]),
            ("pip", &["z"]),
        ]);
        let result = reconcile_packages(declared_items, &observed_sets);
        let from_declared: BTreeSet<String> = result
            .managed
            .iter()
            .chain(&result.missing)
            .chain(&result.drifted)
            .map(Item::key)
            .collect();
        assert_eq!(from_declared, declared_keys);

        let untracked: BTreeSet<String> = result.untracked.iter().map(Item::key).collect();
        assert!(untracked.is_disjoint(&declared_keys));
        assert_eq!(
            untracked,
            ["brew:x", "npm:y", "pip:z"]
                .iter()
                .map(ToString::to_string)
                .collect()
        );

        // no item appears in two lists
        assert_eq!(
            result.len(),
            from_declared.len() + untracked.len()
        );
    }

    #[test]
    fn test_drift_predicate_applies_to_present_items() {
        let mut declared_map = BTreeMap::new();
        let item = Item::dotfile(
            "vimrc",
            std::path::PathBuf::from("/home/u/.vimrc"),
            ReconciliationState::Missing,
        );
        declared_map.insert(item.key(), item);

        let mut observed_map = BTreeMap::new();
        let item = Item::dotfile(
            "vimrc",
            std::path::PathBuf::from("/home/u/.vimrc"),
            ReconciliationState::Untracked,
        );
        observed_map.insert(item.key(), item);

        let result = reconcile(Domain::Dotfile, declared_map, observed_map, |_| true);
        assert_eq!(result.drifted.len(), 1);
        assert!(result.managed.is_empty());
    }
}
