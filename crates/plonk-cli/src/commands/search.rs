use plonk_operations::{search::search, OpsResult, PlonkContext};
use tokio_util::sync::CancellationToken;

use crate::{cli::OutputFormat, display};

pub async fn run(
    ctx: &PlonkContext,
    token: &CancellationToken,
    query: &str,
    format: OutputFormat,
) -> OpsResult<i32> {
    let (manager, names) = search(ctx, token, query).await?;

    if format != OutputFormat::Table {
        display::print_structured(&(&manager, &names), format);
        return Ok(0);
    }

    if names.is_empty() {
        println!("No results from {manager}.");
    } else {
        for name in names {
            println!("{manager}:{name}");
        }
    }
    Ok(0)
}
