//! Console output for the run header and summaries.

use crate::targets::Target;
use bb2gf_migrate::{GlobalSummary, MigrationStatus, PipelineSettings, ProjectSummary, SummaryTotals};
use console::style;

const RULE_WIDTH: usize = 60;

/// Key/value rows describing how one project will be migrated.
pub fn header_rows(target: &Target, api_base: &str, settings: &PipelineSettings) -> Vec<(&'static str, String)> {
    vec![
        ("Source", format!("{}/projects/{}", target.base_url, target.project_key)),
        ("Destination API", api_base.to_string()),
        (
            "Owner",
            format!("{} ({})", settings.owner_alias, settings.owner_type),
        ),
        (
            "Visibility",
            if settings.private { "private" } else { "public" }.to_string(),
        ),
        (
            "Language",
            settings.language.clone().unwrap_or_else(|| "-".to_string()),
        ),
        ("Dry run", yes_no(settings.dry_run).to_string()),
        ("Workdir", settings.workdir.display().to_string()),
        ("Transport", settings.mode.to_string()),
    ]
}

pub fn print_header(target: &Target, api_base: &str, settings: &PipelineSettings) {
    println!();
    println!(
        "{}",
        style(format!("Project {}", target.project_key)).bold().cyan()
    );
    println!("{}", style("═".repeat(RULE_WIDTH)).dim());
    for (label, value) in header_rows(target, api_base, settings) {
        println!("{:<16} {}", format!("{label}:"), value);
    }
    println!();
}

/// Repositories that did not make it, one line each.
pub fn print_failures(summary: &ProjectSummary) {
    for record in summary.items_with_status(MigrationStatus::Failed) {
        println!(
            "  {} {}: {}",
            style("✗").red(),
            style(&record.repo_name).bold(),
            record.message
        );
    }
}

/// The counters as a compact line.
pub fn totals_line(totals: &SummaryTotals) -> String {
    format!(
        "total={} created={} exists={} lfs={} skipped={} errors={}",
        totals.total, totals.created, totals.exists, totals.lfs_pushed, totals.skipped, totals.errors
    )
}

/// Per-project table rows, header row first.
pub fn table_rows(summary: &GlobalSummary) -> Vec<[String; 8]> {
    let mut rows = vec![[
        "PROJECT", "TOTAL", "CREATED", "EXISTS", "LFS", "SKIPPED", "ERRORS", "NOTE",
    ]
    .map(str::to_string)];
    for project in &summary.projects {
        let t = &project.summary.totals;
        rows.push([
            project.project_key.clone(),
            t.total.to_string(),
            t.created.to_string(),
            t.exists.to_string(),
            t.lfs_pushed.to_string(),
            t.skipped.to_string(),
            t.errors.to_string(),
            project.error.clone().unwrap_or_default(),
        ]);
    }
    rows
}

pub fn print_summary(summary: &GlobalSummary) {
    let rows = table_rows(summary);
    let mut widths = [0usize; 8];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    println!();
    println!("{}", style("Migration summary").bold().cyan());
    println!("{}", style("═".repeat(RULE_WIDTH)).dim());
    for (i, row) in rows.iter().enumerate() {
        let line = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        if i == 0 {
            println!("{}", style(line.trim_end()).bold());
        } else {
            println!("{}", line.trim_end());
        }
    }
    println!("{}", style("─".repeat(RULE_WIDTH)).dim());

    let totals = totals_line(&summary.totals);
    if summary.totals.errors > 0 {
        println!("{} {}", style("Totals").bold(), style(totals).yellow());
    } else {
        println!("{} {}", style("Totals").bold(), style(totals).green());
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
