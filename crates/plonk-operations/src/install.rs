//! The install pipeline: resolve specs, invoke adapters, record the lock.

use std::collections::BTreeMap;

use plonk_core::{OperationResult, OperationStatus, PackageSpec};
use plonk_events::{next_op_id, ItemStage, PlonkEvent};
use plonk_managers::registry;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    context::PlonkContext,
    error::{OpsError, OpsResult},
    types::InstallOptions,
};

/// Parses every spec and validates its manager up front, so configuration
/// errors surface before any batch work begins.
pub(crate) fn parse_specs(ctx: &PlonkContext, specs: &[String]) -> OpsResult<Vec<PackageSpec>> {
    let known = registry::names();
    let mut parsed = Vec::with_capacity(specs.len());
    for spec in specs {
        let spec = PackageSpec::parse(spec)?;
        let manager = spec.manager_or(&ctx.config().default_manager);
        if !known.contains(&manager) {
            return Err(OpsError::Manager(
                plonk_managers::ManagerError::UnknownManager {
                    name: manager.to_string(),
                },
            ));
        }
        parsed.push(spec);
    }
    Ok(parsed)
}

/// Installs each spec through its manager and records successes in the
/// lock file. Per-item failures are recorded and processing continues;
/// only configuration errors and cancellation abort the batch.
pub async fn install(
    ctx: &PlonkContext,
    token: &CancellationToken,
    specs: &[String],
    options: &InstallOptions,
) -> OpsResult<Vec<OperationResult>> {
    let parsed = parse_specs(ctx, specs)?;
    let mut results = Vec::with_capacity(parsed.len());

    for spec in parsed {
        let manager_name = spec.manager_or(&ctx.config().default_manager).to_string();
        results.push(install_one(ctx, token, &spec, &manager_name, options).await?);
    }
    Ok(results)
}

async fn install_one(
    ctx: &PlonkContext,
    token: &CancellationToken,
    spec: &PackageSpec,
    manager_name: &str,
    options: &InstallOptions,
) -> OpsResult<OperationResult> {
    let op_id = next_op_id();
    let manager = ctx.manager(manager_name)?;

    if options.dry_run {
        return Ok(
            OperationResult::new(&spec.name, OperationStatus::WouldInstall)
                .with_manager(manager_name),
        );
    }

    if !manager.is_available(token).await? {
        let err = manager.unavailable();
        ctx.events().emit(PlonkEvent::ItemFailed {
            op_id,
            name: spec.name.clone(),
            manager: Some(manager_name.to_string()),
            error: err.to_string(),
        });
        return Ok(failed_with_suggestion(spec, manager_name, &err));
    }

    ctx.events().emit(PlonkEvent::ItemStarted {
        op_id,
        name: spec.name.clone(),
        manager: Some(manager_name.to_string()),
        stage: ItemStage::Installing,
    });

    let install_target = match &spec.version {
        Some(version) => format!("{}@{version}", spec.name),
        None => spec.name.clone(),
    };
    match manager.install(token, &install_target).await {
        Ok(()) => {}
        Err(err) if err.is_cancelled() => return Err(err.into()),
        Err(err) => {
            ctx.events().emit(PlonkEvent::ItemFailed {
                op_id,
                name: spec.name.clone(),
                manager: Some(manager_name.to_string()),
                error: err.to_string(),
            });
            return Ok(failed_with_suggestion(spec, manager_name, &err));
        }
    }

    // The system install succeeded; a lock-write failure demotes this
    // item but never rolls the install back. The lock is allowed to lag.
    ctx.events().emit(PlonkEvent::ItemStarted {
        op_id,
        name: spec.name.clone(),
        manager: Some(manager_name.to_string()),
        stage: ItemStage::RecordingLock,
    });

    let lock_name = manager.lock_name(&spec.name);
    let version = match &spec.version {
        Some(version) => Some(version.clone()),
        None => manager.installed_version(token, &spec.name).await.ok(),
    };
    let metadata: BTreeMap<String, serde_yaml::Value> = manager
        .lock_metadata(&spec.name)
        .into_iter()
        .map(|(key, value)| (key, serde_yaml::Value::String(value)))
        .collect();

    match ctx
        .lock()
        .add_package(manager_name, &lock_name, version.clone(), metadata)
    {
        Ok(()) => {
            debug!(manager = manager_name, package = %spec.name, "installed and recorded");
            ctx.events().emit(PlonkEvent::ItemComplete {
                op_id,
                name: spec.name.clone(),
                manager: Some(manager_name.to_string()),
            });
            Ok(OperationResult::new(&lock_name, OperationStatus::Added)
                .with_manager(manager_name)
                .with_version(version))
        }
        Err(err) => {
            ctx.events().emit(PlonkEvent::ItemFailed {
                op_id,
                name: spec.name.clone(),
                manager: Some(manager_name.to_string()),
                error: err.to_string(),
            });
            Ok(OperationResult::failed(
                &spec.name,
                format!("installed, but recording the lock file failed: {err}"),
            )
            .with_manager(manager_name))
        }
    }
}

fn failed_with_suggestion(
    spec: &PackageSpec,
    manager_name: &str,
    err: &plonk_managers::ManagerError,
) -> OperationResult {
    let mut result = OperationResult::failed(&spec.name, err).with_manager(manager_name);
    if let Some(help) = miette::Diagnostic::help(err) {
        result
            .metadata
            .insert("suggestion".to_string(), help.to_string());
    }
    result
}
