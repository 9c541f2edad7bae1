use plonk_core::{Domain, ReconcileResult};
use plonk_operations::{reconcile::reconcile_all, OpsResult, PlonkContext};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{cli::OutputFormat, display};

#[derive(Serialize)]
struct StatusPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    packages: Option<&'a ReconcileResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dotfiles: Option<&'a ReconcileResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

pub async fn run(
    ctx: &PlonkContext,
    token: &CancellationToken,
    packages_only: bool,
    dotfiles_only: bool,
    unmanaged: bool,
    format: OutputFormat,
) -> OpsResult<i32> {
    let report = reconcile_all(ctx, token).await?;
    let packages = report.results.get(&Domain::Package);
    let dotfiles = report.results.get(&Domain::Dotfile);

    // Filter flags are presentational; structured output always carries
    // every list.
    if format != OutputFormat::Table {
        display::print_structured(
            &StatusPayload {
                packages,
                dotfiles,
                errors: report
                    .errors
                    .iter()
                    .map(|(domain, message)| format!("{domain}: {message}"))
                    .collect(),
            },
            format,
        );
        return Ok(if report.errors.is_empty() { 0 } else { 1 });
    }

    if let Some(packages) = packages {
        if !dotfiles_only {
            display::print_domain_table(packages, unmanaged);
        }
    }
    if let Some(dotfiles) = dotfiles {
        if !packages_only {
            display::print_domain_table(dotfiles, unmanaged);
        }
    }
    for (domain, message) in &report.errors {
        tracing::error!("{domain} reconciliation failed: {message}");
    }

    Ok(if report.errors.is_empty() { 0 } else { 1 })
}
