use plonk_core::Summary;
use plonk_operations::{install::install, InstallOptions, OpsResult, PlonkContext};
use tokio_util::sync::CancellationToken;

use crate::{cli::OutputFormat, display};

pub async fn run(
    ctx: &PlonkContext,
    token: &CancellationToken,
    specs: &[String],
    dry_run: bool,
    format: OutputFormat,
) -> OpsResult<i32> {
    let results = install(ctx, token, specs, &InstallOptions { dry_run }).await?;
    let summary = Summary::from_results(&results);

    if format == OutputFormat::Table {
        display::print_results(&results, &summary);
    } else {
        display::print_structured(&(&results, &summary), format);
    }
    Ok(summary.exit_code(&results))
}
