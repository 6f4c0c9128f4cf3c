//! Common CLI types shared across commands

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Table format - one row per call (default)
    #[default]
    Table,
    /// JSON format - structured for scripts, includes response bodies
    Json,
}
