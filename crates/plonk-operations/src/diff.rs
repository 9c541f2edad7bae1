//! External diff of drifted dotfiles.
//!
//! The configured tool (default `git diff --no-index`) is invoked with
//! the destination first and the source second, so `-` lines show what
//! is on disk in `$HOME` and `+` lines show the source of truth.

use plonk_core::{CoreError, ReconciliationState};
use plonk_managers::CommandError;
use tokio_util::sync::CancellationToken;

use crate::{
    context::PlonkContext,
    error::{OpsError, OpsResult},
    types::DiffEntry,
};

/// Diffs every drifted dotfile, or only the one matching `path` (by
/// source-relative name or destination path).
pub async fn diff(
    ctx: &PlonkContext,
    token: &CancellationToken,
    path: Option<&str>,
) -> OpsResult<Vec<DiffEntry>> {
    let engine = ctx.dotfiles();
    let mut drifted: Vec<_> = engine
        .scan()?
        .into_iter()
        .filter(|status| status.state == ReconciliationState::Drifted)
        .collect();

    if let Some(path) = path {
        let wanted = plonk_utils::path::expand_tilde(path).map_err(CoreError::Path)?;
        drifted.retain(|status| status.name == path || status.target == wanted);
        if drifted.is_empty() {
            return Err(OpsError::Core(CoreError::FileNotFound {
                path: wanted,
            }));
        }
    }

    let command = ctx.config().diff_command();
    let (program, base_args) = command
        .split_first()
        .expect("diff_command is never empty");

    let mut entries = Vec::with_capacity(drifted.len());
    for status in drifted {
        let target = status.target.display().to_string();
        let source = status.source.display().to_string();
        let mut args: Vec<&str> = base_args.iter().map(String::as_str).collect();
        args.push(&target);
        args.push(&source);

        // diff tools exit 1 when the files differ; only other codes are
        // real failures
        let output = match ctx.runner().execute_combined(token, program, &args).await {
            Ok(output) => output,
            Err(CommandError::ExitStatus { code: Some(1), output, .. }) => output,
            Err(err) => return Err(plonk_managers::ManagerError::from(err).into()),
        };

        entries.push(DiffEntry {
            name: status.name,
            target: status.target,
            source: status.source,
            output,
        });
    }
    Ok(entries)
}
