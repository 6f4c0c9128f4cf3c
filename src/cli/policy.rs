//! Policy check command

use anyhow::Context;
use colored::Colorize;
use std::path::Path;

use hawkcache::cache::PolicySummary;
use hawkcache::config::Config;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::output::json::format_json;
use crate::output::table::{FieldRow, format_table};

/// Validate the global cache policy from `file` or the active config
pub fn check(opts: &GlobalOptions, file: Option<&str>) -> anyhow::Result<()> {
    let config = match file {
        Some(file) => Config::load_from(Path::new(file))?,
        None => Config::load_at(opts.config_ref())?,
    };

    let policy = config
        .global_policy()
        .context("Global cache policy is invalid")?;
    let summary = policy.summary();

    match opts.format {
        OutputFormat::Json => println!("{}", format_json(&summary)?),
        OutputFormat::Table => {
            println!("{} Global cache policy is valid", "✓".green());
            println!("{}", format_table(&summary_rows(&summary)));
        }
    }
    Ok(())
}

fn summary_rows(summary: &PolicySummary) -> Vec<FieldRow> {
    vec![
        FieldRow::new("useCache", summary.use_cache),
        FieldRow::new("methods", summary.methods.join(", ")),
        FieldRow::new("timeToLive", format!("{} ms", summary.time_to_live_ms)),
    ]
}
