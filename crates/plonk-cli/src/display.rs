//! Table and structured rendering.

use nu_ansi_term::Color::{Green, Red, Yellow};
use plonk_core::{OperationResult, OperationStatus, ReconcileResult, Summary};
use plonk_managers::{HealthCheck, HealthStatus};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::OutputFormat;

pub fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

fn paint(text: &str, color: nu_ansi_term::Color) -> String {
    if colors_enabled() {
        color.paint(text).to_string()
    } else {
        text.to_string()
    }
}

pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(value).expect("serializable payload")
            );
        }
        OutputFormat::Yaml => {
            print!(
                "{}",
                serde_yaml::to_string(value).expect("serializable payload")
            );
        }
        OutputFormat::Table => unreachable!("table output is rendered per command"),
    }
}

#[derive(Tabled)]
struct StatusRow {
    name: String,
    manager: String,
    state: String,
}

pub fn print_domain_table(result: &ReconcileResult, unmanaged_only: bool) {
    let items = if unmanaged_only {
        result.untracked.iter().collect::<Vec<_>>()
    } else {
        result
            .managed
            .iter()
            .chain(&result.missing)
            .chain(&result.drifted)
            .chain(&result.untracked)
            .collect()
    };
    if items.is_empty() {
        println!("{}: nothing to show", result.domain);
        return;
    }

    let rows: Vec<StatusRow> = items
        .into_iter()
        .map(|item| StatusRow {
            name: item.name.clone(),
            manager: item.manager.clone().unwrap_or_else(|| "-".into()),
            state: state_label(item.state),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::sharp()));
}

fn state_label(state: plonk_core::ReconciliationState) -> String {
    use plonk_core::ReconciliationState as S;
    match state {
        S::Managed => paint("managed", Green),
        S::Missing => paint("missing", Yellow),
        S::Drifted => paint("drifted", Yellow),
        S::Untracked => paint("untracked", Red),
    }
}

#[derive(Tabled)]
struct ResultRow {
    name: String,
    manager: String,
    status: String,
    detail: String,
}

pub fn print_results(results: &[OperationResult], summary: &Summary) {
    if !results.is_empty() {
        let rows: Vec<ResultRow> = results
            .iter()
            .map(|result| ResultRow {
                name: result.name.clone(),
                manager: result.manager.clone().unwrap_or_else(|| "-".into()),
                status: status_label(result.status),
                detail: result
                    .error
                    .clone()
                    .or_else(|| result.version.clone())
                    .unwrap_or_default(),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::sharp()));
    }

    println!(
        "{} added, {} updated, {} removed, {} unlinked, {} skipped, {} failed",
        summary.added,
        summary.updated,
        summary.removed,
        summary.unlinked,
        summary.skipped,
        summary.failed
    );
}

fn status_label(status: OperationStatus) -> String {
    match status {
        OperationStatus::Failed => paint(&status.to_string(), Red),
        OperationStatus::Skipped => paint(&status.to_string(), Yellow),
        OperationStatus::WouldInstall | OperationStatus::WouldRemove
        | OperationStatus::WouldUpdate => paint(&status.to_string(), Yellow),
        _ => paint(&status.to_string(), Green),
    }
}

#[derive(Tabled)]
struct HealthRow {
    name: String,
    category: String,
    status: String,
    message: String,
}

pub fn print_health(checks: &[HealthCheck]) {
    let rows: Vec<HealthRow> = checks
        .iter()
        .map(|check| HealthRow {
            name: check.name.clone(),
            category: check.category.clone(),
            status: match check.status {
                HealthStatus::Pass => paint("pass", Green),
                HealthStatus::Warn => paint("warn", Yellow),
                HealthStatus::Fail => paint("fail", Red),
            },
            message: check.message.clone(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::sharp()));

    for check in checks {
        for suggestion in &check.suggestions {
            println!("  {}: {suggestion}", check.name);
        }
    }
}
