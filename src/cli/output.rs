// Output formatting and display for CLI

use crate::logs::{LevelSummary, LogLevel, LogLine, LogPage};
use colored::*;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print a page of log lines with the level highlighted
pub fn print_page(page: &LogPage) {
    if page.logs.is_empty() {
        println!("{}", "No matching log lines".yellow());
    }

    for raw in &page.logs {
        println!("{}", format_line(raw));
    }

    println!(
        "{}",
        format!("page {} of {}", page.page, page.total_pages).dimmed()
    );
}

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a table of line counts per level
pub fn print_level_summary(summary: &LevelSummary) {
    #[derive(Tabled)]
    struct LevelRow {
        #[tabled(rename = "Level")]
        level: String,
        #[tabled(rename = "Lines")]
        lines: usize,
    }

    let mut rows: Vec<LevelRow> = LogLevel::ALL
        .iter()
        .map(|level| LevelRow {
            level: color_level(*level, level.as_str()),
            lines: summary.counts.get(level).copied().unwrap_or(0),
        })
        .collect();
    rows.push(LevelRow {
        level: "(none)".dimmed().to_string(),
        lines: summary.unleveled,
    });

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);
    println!(
        "{}",
        format!(
            "Total: {} line(s), {} trace(s)",
            summary.total(),
            summary.traces
        )
        .dimmed()
    );
}

/// Colour the level token of a raw line
fn format_line(raw: &str) -> String {
    let line = LogLine::parse(raw);
    match line.level {
        Some(level) if raw.starts_with(level.as_str()) => {
            let rest = &raw[level.as_str().len()..];
            format!("{}{}", color_level(level, level.as_str()), rest)
        }
        _ => raw.to_string(),
    }
}

fn color_level(level: LogLevel, text: &str) -> String {
    match level {
        LogLevel::Debug => text.dimmed().to_string(),
        LogLevel::Info => text.green().to_string(),
        LogLevel::Warning => text.yellow().to_string(),
        LogLevel::Error => text.red().to_string(),
        LogLevel::Critical => text.red().bold().to_string(),
    }
}
