//! Global CLI options shared across all commands

use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to all command handlers.
///
/// # Precedence
///
/// CLI flag > environment variable > config file > default. This struct
/// captures the CLI/env layer; config file values are merged in
/// `CommandContext`.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Output format (table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.hawkcache/config.yaml)
    pub config: Option<String>,

    /// Session identifier override
    pub session: Option<String>,

    /// Base URL override
    pub base_url: Option<String>,
}

impl GlobalOptions {
    /// Create GlobalOptions from a parsed CLI struct.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            session: cli.session.clone(),
            base_url: cli.base_url.clone(),
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// Get session override as `Option<&str>`.
    pub fn session_ref(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Get base URL override as `Option<&str>`.
    pub fn base_url_ref(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_options_accessors() {
        let opts = GlobalOptions {
            format: OutputFormat::Json,
            config: Some("/custom/path".to_string()),
            session: Some("user-1".to_string()),
            base_url: Some("http://localhost:8080".to_string()),
        };

        assert_eq!(opts.config_ref(), Some("/custom/path"));
        assert_eq!(opts.session_ref(), Some("user-1"));
        assert_eq!(opts.base_url_ref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_global_options_none_accessors() {
        let opts = GlobalOptions {
            format: OutputFormat::Table,
            config: None,
            session: None,
            base_url: None,
        };

        assert_eq!(opts.config_ref(), None);
        assert_eq!(opts.session_ref(), None);
        assert_eq!(opts.base_url_ref(), None);
    }
}
