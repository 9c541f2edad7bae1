//! The apply pipeline: converge system state on the declared state.
//!
//! Missing packages are grouped by manager and installed serially within
//! each manager (two `brew install`s never run concurrently) while
//! managers proceed in parallel. Dotfile deployment is fully serialized
//! so directory creation order stays deterministic. Per-item failures are
//! recorded and the batch continues.

use std::collections::BTreeMap;

use futures::future::join_all;
use plonk_core::{Domain, Item, OperationResult, OperationStatus, ReconciliationState};
use plonk_events::{next_op_id, ItemStage, PlonkEvent};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    context::PlonkContext,
    error::OpsResult,
    reconcile::reconcile_all,
    types::{ApplyOptions, ApplyReport, ApplyScope},
};

/// Reconciles, then installs missing packages and deploys missing or
/// drifted dotfiles. With `dry_run`, reports what would happen without
/// invoking any manager or touching any file.
pub async fn apply(
    ctx: &PlonkContext,
    token: &CancellationToken,
    options: &ApplyOptions,
) -> OpsResult<ApplyReport> {
    let reconciled = reconcile_all(ctx, token).await?;
    let mut results = Vec::new();

    let packages_in_scope = matches!(options.scope, ApplyScope::All | ApplyScope::Packages);
    let dotfiles_in_scope = !matches!(options.scope, ApplyScope::Packages);

    if packages_in_scope {
        if let Some(packages) = reconciled.results.get(&Domain::Package) {
            results.extend(apply_packages(ctx, token, &packages.missing, options).await);
        }
    }

    if dotfiles_in_scope {
        if let Some(dotfiles) = reconciled.results.get(&Domain::Dotfile) {
            results.extend(apply_dotfiles(ctx, dotfiles.missing.iter().chain(&dotfiles.drifted), options));
        }
    }

    let report = ApplyReport::from_results(results);
    ctx.events().emit(PlonkEvent::BatchProgress {
        completed: report.results.len() as u32,
        total: report.results.len() as u32,
        failed: report.summary.failed as u32,
    });
    Ok(report)
}

async fn apply_packages(
    ctx: &PlonkContext,
    token: &CancellationToken,
    missing: &[Item],
    options: &ApplyOptions,
) -> Vec<OperationResult> {
    // group by manager; BTreeMap keeps manager iteration order stable
    let mut groups: BTreeMap<String, Vec<&Item>> = BTreeMap::new();
    for item in missing {
        let Some(manager) = &item.manager else {
            continue;
        };
        groups.entry(manager.clone()).or_default().push(item);
    }
    for items in groups.values_mut() {
        items.sort_by(|a, b| a.name.cmp(&b.name));
    }

    if options.dry_run {
        return groups
            .iter()
            .flat_map(|(manager, items)| {
                items.iter().map(|item| {
                    OperationResult::new(&item.name, OperationStatus::WouldInstall)
                        .with_manager(manager)
                })
            })
            .collect();
    }

    // serialized within a manager, parallel across managers
    let tasks = groups.iter().map(|(manager_name, items)| async move {
        let mut group_results = Vec::with_capacity(items.len());
        let manager = match ctx.manager(manager_name) {
            Ok(manager) => manager,
            Err(err) => {
                for item in items {
                    group_results
                        .push(OperationResult::failed(&item.name, &err).with_manager(manager_name));
                }
                return (manager_name.clone(), group_results);
            }
        };

        let available = matches!(manager.is_available(token).await, Ok(true));
        if !available {
            let err = manager.unavailable();
            for item in items {
                group_results
                    .push(OperationResult::failed(&item.name, &err).with_manager(manager_name));
            }
            return (manager_name.clone(), group_results);
        }

        for &item in items {
            group_results.push(install_missing(ctx, token, &manager, manager_name, item).await);
        }
        (manager_name.clone(), group_results)
    });

    let mut by_manager: BTreeMap<String, Vec<OperationResult>> =
        join_all(tasks).await.into_iter().collect();
    let mut results = Vec::new();
    for (_, group) in by_manager.iter_mut() {
        results.append(group);
    }
    results
}

async fn install_missing(
    ctx: &PlonkContext,
    token: &CancellationToken,
    manager: &std::sync::Arc<dyn plonk_managers::PackageManager>,
    manager_name: &str,
    item: &Item,
) -> OperationResult {
    let op_id = next_op_id();
    ctx.events().emit(PlonkEvent::ItemStarted {
        op_id,
        name: item.name.clone(),
        manager: Some(manager_name.to_string()),
        stage: ItemStage::Installing,
    });

    // lock entries for go carry the module path in metadata
    let install_target = item
        .metadata
        .get("source_path")
        .cloned()
        .unwrap_or_else(|| item.name.clone());

    match manager.install(token, &install_target).await {
        Ok(()) => {
            let version = manager.installed_version(token, &item.name).await.ok();
            debug!(manager = manager_name, package = %item.name, "installed");
            ctx.events().emit(PlonkEvent::ItemComplete {
                op_id,
                name: item.name.clone(),
                manager: Some(manager_name.to_string()),
            });
            OperationResult::new(&item.name, OperationStatus::Added)
                .with_manager(manager_name)
                .with_version(version)
        }
        Err(err) => {
            ctx.events().emit(PlonkEvent::ItemFailed {
                op_id,
                name: item.name.clone(),
                manager: Some(manager_name.to_string()),
                error: err.to_string(),
            });
            OperationResult::failed(&item.name, &err).with_manager(manager_name)
        }
    }
}

fn apply_dotfiles<'a>(
    ctx: &PlonkContext,
    pending: impl Iterator<Item = &'a Item>,
    options: &ApplyOptions,
) -> Vec<OperationResult> {
    let engine = ctx.dotfiles();
    let mut items: Vec<&Item> = pending.collect();
    items.sort_by(|a, b| a.name.cmp(&b.name));

    if let ApplyScope::Files(names) = &options.scope {
        items.retain(|item| names.iter().any(|name| *name == item.name));
    }

    let mut results = Vec::with_capacity(items.len());
    for item in items {
        let (done, would) = match item.state {
            ReconciliationState::Missing => {
                (OperationStatus::Added, OperationStatus::WouldInstall)
            }
            _ => (OperationStatus::Updated, OperationStatus::WouldUpdate),
        };

        if options.dry_run {
            results.push(OperationResult::new(&item.name, would));
            continue;
        }

        let op_id = next_op_id();
        ctx.events().emit(PlonkEvent::ItemStarted {
            op_id,
            name: item.name.clone(),
            manager: None,
            stage: ItemStage::Deploying,
        });
        match engine.deploy(&item.name, None) {
            Ok(()) => {
                ctx.events().emit(PlonkEvent::ItemComplete {
                    op_id,
                    name: item.name.clone(),
                    manager: None,
                });
                results.push(OperationResult::new(&item.name, done));
            }
            Err(err) => {
                ctx.events().emit(PlonkEvent::ItemFailed {
                    op_id,
                    name: item.name.clone(),
                    manager: None,
                    error: err.to_string(),
                });
                results.push(OperationResult::failed(&item.name, &err));
            }
        }
    }
    results
}
