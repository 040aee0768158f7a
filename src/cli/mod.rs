// CLI module - Query a log file from the terminal

mod output;

pub use output::print_error;

use crate::error::{BoardlogError, Result};
use crate::logs::{read_log_page, scan_levels, LogQuery, TotalPagesRule, DEFAULT_LOGS_PER_PAGE};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Boardlog - read and filter the job board's request log
#[derive(Parser)]
#[command(name = "boardlog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one page of matching log lines
    Query {
        /// Path to the log file
        file: PathBuf,

        /// Only lines with this level (DEBUG, INFO, WARNING, ERROR, CRITICAL)
        #[arg(short, long)]
        level: Option<String>,

        /// Only lines from this request
        #[arg(short, long)]
        trace_id: Option<String>,

        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Lines per page
        #[arg(long, default_value_t = DEFAULT_LOGS_PER_PAGE)]
        per_page: usize,

        /// Count pages as `matched / per_page + 1` (adds a trailing empty page at exact multiples)
        #[arg(long)]
        legacy_pages: bool,

        /// Print the page as the JSON body served by /api/logs/
        #[arg(long)]
        json: bool,
    },

    /// Count lines per level
    Levels {
        /// Path to the log file
        file: PathBuf,
    },
}

impl Cli {
    /// Run the CLI application
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute()
    }

    /// Execute the parsed command
    fn execute(&self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        match &self.command {
            Commands::Query {
                file,
                level,
                trace_id,
                page,
                per_page,
                legacy_pages,
                json,
            } => {
                let query = LogQuery::new(
                    level.as_deref().unwrap_or(""),
                    trace_id.as_deref().unwrap_or(""),
                    *page,
                    *per_page,
                )?;
                let rule = if *legacy_pages {
                    TotalPagesRule::Legacy
                } else {
                    TotalPagesRule::Exact
                };

                let result = runtime.block_on(read_log_page(file, &query, rule))?;

                if *json {
                    let body = serde_json::to_string_pretty(&result)
                        .map_err(|e| BoardlogError::SerializationError(e.to_string()))?;
                    println!("{}", body);
                } else {
                    output::print_page(&result);
                }
                Ok(())
            }

            Commands::Levels { file } => {
                if !file.exists() {
                    output::print_info(&format!("{} does not exist", file.display()));
                }
                let summary = runtime.block_on(scan_levels(file))?;
                output::print_level_summary(&summary);
                Ok(())
            }
        }
    }
}
