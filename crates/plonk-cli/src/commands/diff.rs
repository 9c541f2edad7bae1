use plonk_operations::{diff::diff, OpsResult, PlonkContext};
use tokio_util::sync::CancellationToken;

pub async fn run(
    ctx: &PlonkContext,
    token: &CancellationToken,
    path: Option<&str>,
) -> OpsResult<i32> {
    let entries = diff(ctx, token, path).await?;
    if entries.is_empty() {
        println!("No drifted dotfiles.");
        return Ok(0);
    }
    for entry in entries {
        println!("--- {}", entry.name);
        print!("{}", entry.output);
        if !entry.output.ends_with('\n') {
            println!();
        }
    }
    Ok(0)
}
