use plonk_operations::{search::info, OpsResult, PlonkContext};
use tokio_util::sync::CancellationToken;

use crate::{cli::OutputFormat, display};

pub async fn run(
    ctx: &PlonkContext,
    token: &CancellationToken,
    spec: &str,
    format: OutputFormat,
) -> OpsResult<i32> {
    let info = info(ctx, token, spec).await?;

    if format != OutputFormat::Table {
        display::print_structured(&info, format);
        return Ok(0);
    }

    println!("name: {}", info.name);
    println!("manager: {}", info.manager);
    println!("installed: {}", info.installed);
    if let Some(version) = &info.version {
        println!("version: {version}");
    }
    if let Some(description) = &info.description {
        println!("description: {description}");
    }
    if let Some(homepage) = &info.homepage {
        println!("homepage: {homepage}");
    }
    if !info.dependencies.is_empty() {
        println!("dependencies: {}", info.dependencies.join(", "));
    }
    Ok(0)
}
