//! The uninstall pipeline.

use plonk_core::{OperationResult, OperationStatus};
use plonk_events::{next_op_id, ItemStage, PlonkEvent};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    context::PlonkContext,
    error::OpsResult,
    install::parse_specs,
    types::UninstallOptions,
};

/// Uninstalls each spec and removes its lock entry. A package that is not
/// in the lock still passes through the manager and reports removed.
pub async fn uninstall(
    ctx: &PlonkContext,
    token: &CancellationToken,
    specs: &[String],
    options: &UninstallOptions,
) -> OpsResult<Vec<OperationResult>> {
    let parsed = parse_specs(ctx, specs)?;
    let mut results = Vec::with_capacity(parsed.len());

    for spec in parsed {
        let manager_name = spec.manager_or(&ctx.config().default_manager).to_string();
        let op_id = next_op_id();
        let manager = ctx.manager(&manager_name)?;
        let lock_name = manager.lock_name(&spec.name);

        if options.dry_run {
            results.push(
                OperationResult::new(&lock_name, OperationStatus::WouldRemove)
                    .with_manager(&manager_name),
            );
            continue;
        }

        if !manager.is_available(token).await? {
            let err = manager.unavailable();
            results.push(OperationResult::failed(&spec.name, &err).with_manager(&manager_name));
            continue;
        }

        ctx.events().emit(PlonkEvent::ItemStarted {
            op_id,
            name: spec.name.clone(),
            manager: Some(manager_name.clone()),
            stage: ItemStage::Uninstalling,
        });

        match manager.uninstall(token, &spec.name).await {
            Ok(()) => {}
            Err(err) if err.is_cancelled() => return Err(err.into()),
            Err(err) => {
                ctx.events().emit(PlonkEvent::ItemFailed {
                    op_id,
                    name: spec.name.clone(),
                    manager: Some(manager_name.clone()),
                    error: err.to_string(),
                });
                results.push(OperationResult::failed(&spec.name, &err).with_manager(&manager_name));
                continue;
            }
        }

        // Removing an absent lock entry is a no-op; the result still
        // reports the package as removed from the system.
        let result = match ctx.lock().remove_package(&manager_name, &lock_name) {
            Ok(()) => OperationResult::new(&lock_name, OperationStatus::Removed)
                .with_manager(&manager_name),
            Err(err) => OperationResult::failed(
                &lock_name,
                format!("uninstalled, but updating the lock file failed: {err}"),
            )
            .with_manager(&manager_name),
        };
        debug!(manager = %manager_name, package = %lock_name, "uninstalled");
        ctx.events().emit(PlonkEvent::ItemComplete {
            op_id,
            name: spec.name.clone(),
            manager: Some(manager_name.clone()),
        });
        results.push(result);
    }
    Ok(results)
}
