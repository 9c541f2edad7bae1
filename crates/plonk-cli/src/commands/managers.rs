use plonk_managers::registry;
use plonk_operations::{OpsResult, PlonkContext};
use tokio_util::sync::CancellationToken;

use crate::{cli::OutputFormat, display};

pub async fn run(
    ctx: &PlonkContext,
    token: &CancellationToken,
    install: Option<&str>,
    format: OutputFormat,
) -> OpsResult<i32> {
    if let Some(name) = install {
        plonk_operations::doctor::self_install_manager(ctx, token, name).await?;
        println!("{name} installed");
        return Ok(0);
    }

    let available = registry::available(ctx.runner(), token).await;

    if format != OutputFormat::Table {
        let payload: Vec<_> = registry::names()
            .into_iter()
            .map(|name| {
                serde_json::json!({
                    "name": name,
                    "available": available.iter().any(|a| a == name),
                    "default": name == ctx.config().default_manager,
                })
            })
            .collect();
        display::print_structured(&payload, format);
        return Ok(0);
    }

    for name in registry::names() {
        let mark = if available.iter().any(|a| a == name) {
            "available"
        } else {
            "not available"
        };
        let default = if name == ctx.config().default_manager {
            " (default)"
        } else {
            ""
        };
        println!("{name}: {mark}{default}");
    }
    Ok(0)
}
