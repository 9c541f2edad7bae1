use plonk_managers::HealthStatus;
use plonk_operations::{doctor::doctor, OpsResult, PlonkContext};
use tokio_util::sync::CancellationToken;

use crate::{cli::OutputFormat, display};

pub async fn run(
    ctx: &PlonkContext,
    token: &CancellationToken,
    format: OutputFormat,
) -> OpsResult<i32> {
    let checks = doctor(ctx, token).await?;

    if format == OutputFormat::Table {
        display::print_health(&checks);
    } else {
        display::print_structured(&checks, format);
    }

    let failed = checks
        .iter()
        .any(|check| check.status == HealthStatus::Fail);
    Ok(if failed { 1 } else { 0 })
}
