//! Cross-domain reconciliation.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::join_all;
use plonk_core::{reconcile::reconcile_packages, Domain, Item, ReconcileResult};
use plonk_events::PlonkEvent;
use plonk_managers::registry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{context::PlonkContext, error::OpsResult, types::ReconcileReport};

/// Reconciles the package and dotfile domains concurrently.
///
/// Each domain runs under the configured reconcile deadline. A domain
/// that fails or times out is reported in the returned `errors` and does
/// not block the other domain.
pub async fn reconcile_all(
    ctx: &PlonkContext,
    token: &CancellationToken,
) -> OpsResult<ReconcileReport> {
    let deadline = Duration::from_secs(ctx.config().reconcile_timeout_secs);

    ctx.events().emit(PlonkEvent::ReconcileStarting {
        domain: Domain::Package.to_string(),
    });
    ctx.events().emit(PlonkEvent::ReconcileStarting {
        domain: Domain::Dotfile.to_string(),
    });

    let (packages, dotfiles) = tokio::join!(
        tokio::time::timeout(deadline, packages_domain(ctx, token)),
        tokio::time::timeout(deadline, dotfiles_domain(ctx)),
    );

    let mut report = ReconcileReport::default();
    collect_domain(&mut report, Domain::Package, deadline, packages);
    collect_domain(&mut report, Domain::Dotfile, deadline, dotfiles);

    for result in report.results.values() {
        ctx.events().emit(PlonkEvent::ReconcileComplete {
            domain: result.domain.to_string(),
            managed: result.managed.len(),
            missing: result.missing.len(),
            drifted: result.drifted.len(),
            untracked: result.untracked.len(),
        });
    }

    Ok(report)
}

fn collect_domain(
    report: &mut ReconcileReport,
    domain: Domain,
    deadline: Duration,
    outcome: Result<OpsResult<ReconcileResult>, tokio::time::error::Elapsed>,
) {
    match outcome {
        Ok(Ok(result)) => {
            report.results.insert(domain, result);
        }
        Ok(Err(err)) => {
            warn!(%domain, error = %err, "domain reconciliation failed");
            report.errors.push((domain, err.to_string()));
        }
        Err(_) => {
            warn!(%domain, "domain reconciliation timed out");
            report
                .errors
                .push((domain, format!("timed out after {}s", deadline.as_secs())));
        }
    }
}

/// Reconciles the package domain.
///
/// Declared entries come from the lock file; observed sets come from
/// probing every registered manager in parallel. An unavailable manager
/// (or one whose listing fails) contributes an empty observed set.
pub async fn packages_domain(
    ctx: &PlonkContext,
    token: &CancellationToken,
) -> OpsResult<ReconcileResult> {
    let lock = ctx.lock().read()?;
    let declared: Vec<Item> = lock
        .resources
        .iter()
        .map(|entry| {
            let mut item = Item::package(
                &entry.manager,
                &entry.name,
                plonk_core::ReconciliationState::Missing,
            );
            if let Some(version) = &entry.version {
                item.metadata
                    .insert("version".to_string(), version.clone());
            }
            for (key, value) in &entry.metadata {
                if let Some(value) = value.as_str() {
                    item.metadata.insert(key.clone(), value.to_string());
                }
            }
            item
        })
        .collect();

    let probes = registry::names().into_iter().map(|name| {
        let manager = ctx.manager(name);
        async move {
            let manager = match manager {
                Ok(manager) => manager,
                Err(_) => return (name, Vec::new()),
            };
            match manager.is_available(token).await {
                Ok(true) => match manager.list_installed(token).await {
                    Ok(names) => (name, names),
                    Err(err) => {
                        warn!(manager = name, error = %err, "listing installed packages failed");
                        (name, Vec::new())
                    }
                },
                _ => (name, Vec::new()),
            }
        }
    });

    let mut observed: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, names) in join_all(probes).await {
        if !names.is_empty() {
            observed.insert(name.to_string(), names);
        }
    }
    debug!(
        declared = declared.len(),
        managers = observed.len(),
        "package domain reconciled"
    );

    Ok(reconcile_packages(declared, &observed))
}

async fn dotfiles_domain(ctx: &PlonkContext) -> OpsResult<ReconcileResult> {
    Ok(ctx.dotfiles().reconcile()?)
}
