use plonk_core::Summary;
use plonk_operations::{uninstall::uninstall, OpsResult, PlonkContext, UninstallOptions};
use tokio_util::sync::CancellationToken;

use crate::{cli::OutputFormat, display};

pub async fn run(
    ctx: &PlonkContext,
    token: &CancellationToken,
    specs: &[String],
    dry_run: bool,
    format: OutputFormat,
) -> OpsResult<i32> {
    let results = uninstall(ctx, token, specs, &UninstallOptions { dry_run }).await?;
    let summary = Summary::from_results(&results);

    if format == OutputFormat::Table {
        display::print_results(&results, &summary);
    } else {
        display::print_structured(&(&results, &summary), format);
    }
    Ok(summary.exit_code(&results))
}
