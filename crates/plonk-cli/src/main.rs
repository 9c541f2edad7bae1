mod cli;
mod commands;
mod display;
mod logging;
mod progress;

use std::sync::Arc;

use clap::Parser;
use plonk_events::{ChannelSink, EventSinkHandle};
use plonk_managers::SystemRunner;
use plonk_operations::PlonkContext;
use tokio_util::sync::CancellationToken;

use crate::cli::{Args, Command};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::setup_logging(&args);

    let code = run(args).await;
    std::process::exit(code);
}

async fn run(args: Args) -> i32 {
    let runner = Arc::new(SystemRunner::new());
    let (sink, rx) = ChannelSink::new();
    let events: EventSinkHandle = Arc::new(sink);
    let renderer = progress::spawn_renderer(rx);

    let ctx = match PlonkContext::discover(runner, events) {
        Ok(ctx) => ctx,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            return code;
        }
    };

    // ctrl-c cancels in-flight subprocesses and stops new ones
    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        }
    });

    let outcome = dispatch(&ctx, &token, &args).await;
    drop(ctx);
    let _ = renderer.join();

    match outcome {
        Ok(code) => code,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    }
}

async fn dispatch(
    ctx: &PlonkContext,
    token: &CancellationToken,
    args: &Args,
) -> plonk_operations::OpsResult<i32> {
    let format = args.output;
    match &args.command {
        Command::Status {
            packages,
            dotfiles,
            unmanaged,
        } => commands::status::run(ctx, token, *packages, *dotfiles, *unmanaged, format).await,
        Command::Apply {
            dry_run,
            packages,
            dotfiles,
        } => commands::apply::run(ctx, token, *dry_run, *packages, *dotfiles, format).await,
        Command::Install { specs, dry_run } => {
            commands::install::run(ctx, token, specs, *dry_run, format).await
        }
        Command::Uninstall { specs, dry_run } => {
            commands::uninstall::run(ctx, token, specs, *dry_run, format).await
        }
        Command::Upgrade { specs } => commands::upgrade::run(ctx, token, specs, format).await,
        Command::Add { paths, yes } => commands::add::run(ctx, token, paths, *yes, format).await,
        Command::Rm { paths } => commands::rm::run(ctx, token, paths, format).await,
        Command::Diff { path } => commands::diff::run(ctx, token, path.as_deref()).await,
        Command::Search { query } => commands::search::run(ctx, token, query, format).await,
        Command::Info { spec } => commands::info::run(ctx, token, spec, format).await,
        Command::Doctor => commands::doctor::run(ctx, token, format).await,
        Command::Managers { install } => {
            commands::managers::run(ctx, token, install.as_deref(), format).await
        }
    }
}

