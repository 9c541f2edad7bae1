use plonk_core::Summary;
use plonk_operations::{
    dotfiles::{add, AddOptions},
    OpsResult, PlonkContext,
};
use tokio_util::sync::CancellationToken;

use crate::{cli::OutputFormat, display};

pub async fn run(
    ctx: &PlonkContext,
    token: &CancellationToken,
    paths: &[String],
    overwrite: bool,
    format: OutputFormat,
) -> OpsResult<i32> {
    let results = add(ctx, token, paths, &AddOptions { overwrite }).await?;
    let summary = Summary::from_results(&results);

    if format == OutputFormat::Table {
        display::print_results(&results, &summary);
    } else {
        display::print_structured(&(&results, &summary), format);
    }
    Ok(summary.exit_code(&results))
}
