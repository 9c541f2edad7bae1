//! The upgrade pipeline.
//!
//! An empty spec list upgrades every managed package whose manager is
//! available. Upgrades are grouped by manager, serialized within each
//! manager and parallel across managers; a manager that turns out to be
//! unavailable fails every item assigned to it rather than skipping them.

use std::collections::BTreeMap;

use futures::future::join_all;
use plonk_core::{lock::ResourceEntry, OperationResult, OperationStatus, PackageSpec};
use plonk_events::{next_op_id, ItemStage, PlonkEvent};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{context::PlonkContext, error::OpsResult};

pub async fn upgrade(
    ctx: &PlonkContext,
    token: &CancellationToken,
    specs: &[String],
) -> OpsResult<Vec<OperationResult>> {
    let lock = ctx.lock().read()?;

    let targets: Vec<ResourceEntry> = if specs.is_empty() {
        lock.resources.clone()
    } else {
        let mut targets = Vec::new();
        for raw in specs {
            let spec = PackageSpec::parse(raw)?;
            let matched: Vec<&ResourceEntry> = lock
                .resources
                .iter()
                .filter(|entry| {
                    entry.name == spec.name
                        && spec
                            .manager
                            .as_deref()
                            .is_none_or(|manager| entry.manager == manager)
                })
                .collect();
            if matched.is_empty() {
                return Err(crate::error::OpsError::Manager(
                    plonk_managers::ManagerError::NotFound {
                        manager: spec
                            .manager
                            .unwrap_or_else(|| ctx.config().default_manager.clone()),
                        package: spec.name,
                    },
                ));
            }
            targets.extend(matched.into_iter().cloned());
        }
        targets
    };

    let mut groups: BTreeMap<String, Vec<ResourceEntry>> = BTreeMap::new();
    for entry in targets {
        groups.entry(entry.manager.clone()).or_default().push(entry);
    }
    for entries in groups.values_mut() {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
    }

    let tasks = groups.into_iter().map(|(manager_name, entries)| async move {
        (
            manager_name.clone(),
            upgrade_group(ctx, token, &manager_name, entries).await,
        )
    });

    let by_manager: BTreeMap<String, Vec<OperationResult>> =
        join_all(tasks).await.into_iter().collect();
    Ok(by_manager.into_values().flatten().collect())
}

async fn upgrade_group(
    ctx: &PlonkContext,
    token: &CancellationToken,
    manager_name: &str,
    entries: Vec<ResourceEntry>,
) -> Vec<OperationResult> {
    let manager = match ctx.manager(manager_name) {
        Ok(manager) => manager,
        Err(err) => {
            return entries
                .iter()
                .map(|entry| OperationResult::failed(&entry.name, &err).with_manager(manager_name))
                .collect();
        }
    };

    if !matches!(manager.is_available(token).await, Ok(true)) {
        let err = manager.unavailable();
        return entries
            .iter()
            .map(|entry| OperationResult::failed(&entry.name, &err).with_manager(manager_name))
            .collect();
    }

    // go entries upgrade by module path, recorded at install time
    let upgrade_names: Vec<String> = entries
        .iter()
        .map(|entry| {
            entry
                .metadata
                .get("source_path")
                .and_then(|value| value.as_str())
                .unwrap_or(&entry.name)
                .to_string()
        })
        .collect();

    let op_id = next_op_id();
    for entry in &entries {
        ctx.events().emit(PlonkEvent::ItemStarted {
            op_id,
            name: entry.name.clone(),
            manager: Some(manager_name.to_string()),
            stage: ItemStage::Upgrading,
        });
    }

    if let Err(err) = manager.upgrade(token, &upgrade_names).await {
        return entries
            .iter()
            .map(|entry| {
                ctx.events().emit(PlonkEvent::ItemFailed {
                    op_id,
                    name: entry.name.clone(),
                    manager: Some(manager_name.to_string()),
                    error: err.to_string(),
                });
                OperationResult::failed(&entry.name, &err).with_manager(manager_name)
            })
            .collect();
    }

    // read back the new versions and refresh the lock entries
    let mut results = Vec::with_capacity(entries.len());
    for entry in entries {
        let version = manager.installed_version(token, &entry.name).await.ok();
        let result = match ctx.lock().add_package(
            manager_name,
            &entry.name,
            version.clone(),
            entry.metadata.clone(),
        ) {
            Ok(()) => {
                debug!(manager = manager_name, package = %entry.name, ?version, "upgraded");
                ctx.events().emit(PlonkEvent::ItemComplete {
                    op_id,
                    name: entry.name.clone(),
                    manager: Some(manager_name.to_string()),
                });
                OperationResult::new(&entry.name, OperationStatus::Updated)
                    .with_manager(manager_name)
                    .with_version(version)
            }
            Err(err) => OperationResult::failed(
                &entry.name,
                format!("upgraded, but updating the lock file failed: {err}"),
            )
            .with_manager(manager_name),
        };
        results.push(result);
    }
    results
}
