use plonk_operations::{
    apply::apply, ApplyOptions, ApplyScope, OpsResult, PlonkContext,
};
use tokio_util::sync::CancellationToken;

use crate::{cli::OutputFormat, display};

pub async fn run(
    ctx: &PlonkContext,
    token: &CancellationToken,
    dry_run: bool,
    packages: bool,
    dotfiles: bool,
    format: OutputFormat,
) -> OpsResult<i32> {
    let scope = if packages {
        ApplyScope::Packages
    } else if dotfiles {
        ApplyScope::Dotfiles
    } else {
        ApplyScope::All
    };

    let report = apply(ctx, token, &ApplyOptions { dry_run, scope }).await?;

    if format == OutputFormat::Table {
        display::print_results(&report.results, &report.summary);
    } else {
        display::print_structured(&(&report.results, &report.summary), format);
    }
    Ok(report.exit_code())
}
