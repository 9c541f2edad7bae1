//! Search and info, routed to a single manager.

use plonk_core::PackageSpec;
use plonk_managers::PackageInfo;
use tokio_util::sync::CancellationToken;

use crate::{context::PlonkContext, error::OpsResult, install::parse_specs};

/// Searches one manager's repository. The query takes the spec form
/// `[manager:]query`, defaulting to the configured manager.
pub async fn search(
    ctx: &PlonkContext,
    token: &CancellationToken,
    query: &str,
) -> OpsResult<(String, Vec<String>)> {
    let spec = one_spec(ctx, query)?;
    let manager_name = spec.manager_or(&ctx.config().default_manager).to_string();
    let manager = ctx.manager(&manager_name)?;

    if !manager.is_available(token).await? {
        return Err(manager.unavailable().into());
    }
    let names = manager.search(token, &spec.name).await?;
    Ok((manager_name, names))
}

/// Detailed information on one package.
pub async fn info(
    ctx: &PlonkContext,
    token: &CancellationToken,
    spec: &str,
) -> OpsResult<PackageInfo> {
    let spec = one_spec(ctx, spec)?;
    let manager_name = spec.manager_or(&ctx.config().default_manager).to_string();
    let manager = ctx.manager(&manager_name)?;

    if !manager.is_available(token).await? {
        return Err(manager.unavailable().into());
    }
    Ok(manager.info(token, &spec.name).await?)
}

fn one_spec(ctx: &PlonkContext, raw: &str) -> OpsResult<PackageSpec> {
    let specs = [raw.to_string()];
    Ok(parse_specs(ctx, &specs)?
        .into_iter()
        .next()
        .expect("one spec in, one spec out"))
}
