//! Environment and manager health checks.

use futures::future::join_all;
use plonk_managers::{registry, HealthCheck};
use tokio_util::sync::CancellationToken;

use crate::{context::PlonkContext, error::OpsResult};

/// Runs environment checks plus every registered manager's health probe.
/// Health checks never fail the command; problems surface as warn or
/// fail entries in the report.
pub async fn doctor(ctx: &PlonkContext, token: &CancellationToken) -> OpsResult<Vec<HealthCheck>> {
    let mut checks = vec![plonk_dir_check(ctx), lock_check(ctx), default_manager_check(ctx)];

    let probes = registry::names().into_iter().map(|name| {
        let manager = ctx.manager(name);
        async move {
            match manager {
                Ok(manager) => manager.check_health(token).await.unwrap_or_else(|err| {
                    HealthCheck::warn(name, "package-managers", format!("health probe failed: {err}"))
                }),
                Err(err) => {
                    HealthCheck::warn(name, "package-managers", format!("unavailable: {err}"))
                }
            }
        }
    });
    let mut manager_checks = join_all(probes).await;
    manager_checks.sort_by(|a, b| a.name.cmp(&b.name));
    checks.extend(manager_checks);

    Ok(checks)
}

/// Bootstraps a manager through its own installer, installing its
/// dependency managers first. Idempotent: already-available managers are
/// left alone.
pub async fn self_install_manager(
    ctx: &PlonkContext,
    token: &CancellationToken,
    name: &str,
) -> OpsResult<()> {
    let manager = ctx.manager(name)?;
    for dependency in manager.dependencies() {
        let dependency = ctx.manager(dependency)?;
        if !dependency.is_available(token).await? {
            dependency.self_install(token).await?;
        }
    }
    Ok(manager.self_install(token).await?)
}

fn plonk_dir_check(ctx: &PlonkContext) -> HealthCheck {
    let dir = ctx.plonk_dir();
    if dir.is_dir() {
        HealthCheck::pass("plonk-dir", "environment", "exists")
            .with_detail(dir.display().to_string())
    } else {
        HealthCheck::warn("plonk-dir", "environment", "does not exist yet")
            .with_detail(dir.display().to_string())
            .with_suggestion("It will be created the first time you add a package or dotfile")
    }
}

fn lock_check(ctx: &PlonkContext) -> HealthCheck {
    match ctx.lock().read() {
        Ok(lock) => HealthCheck::pass("lock-file", "environment", "parses")
            .with_detail(format!("{} resources", lock.resources.len())),
        Err(err) => HealthCheck::fail("lock-file", "environment", "unreadable")
            .with_detail(err.to_string())
            .with_suggestion("Fix or remove the lock file to start from an empty state"),
    }
}

fn default_manager_check(ctx: &PlonkContext) -> HealthCheck {
    let known = registry::names();
    match ctx.config().validate_default_manager(&known) {
        Ok(()) => HealthCheck::pass("default-manager", "configuration", "known")
            .with_detail(ctx.config().default_manager.clone()),
        Err(err) => HealthCheck::fail("default-manager", "configuration", "unknown")
            .with_detail(err.to_string())
            .with_suggestion(format!("Known managers: {}", known.join(", "))),
    }
}
