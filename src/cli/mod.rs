//! CLI command definitions and handlers

use clap::{Args, Parser, Subcommand};

use hawkcache::UseCache;

pub mod args;
pub mod context;
pub mod fetch;
pub mod policy;
pub mod replay;

pub use args::OutputFormat;
pub use context::CommandContext;

/// hawkcache - session-scoped TTL response cache for HTTP clients
#[derive(Parser, Debug)]
#[command(name = "hawkcache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "HAWKCACHE_FORMAT",
        default_value = "table",
        hide_env = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "HAWKCACHE_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Session identifier the cache is bound to
    #[arg(long, global = true, env = "HAWKCACHE_SESSION", hide_env = true)]
    pub session: Option<String>,

    /// Base URL for relative request URLs
    #[arg(long, global = true, env = "HAWKCACHE_BASE_URL", hide_env = true)]
    pub base_url: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "HAWKCACHE_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// GET a URL through the cache, optionally several times
    Fetch(FetchArgs),

    /// Run a scripted sequence of calls from a YAML file
    Replay {
        /// Path to the steps file
        file: String,
    },

    /// Inspect cache policy configuration
    #[command(subcommand)]
    Policy(PolicyCommands),

    /// Display version information
    Version,
}

/// Arguments for `fetch`
#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// URL or path relative to the base URL
    pub url: String,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "param", short = 'p', value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Number of times to issue the call
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,

    /// Per-call time to live in milliseconds
    #[arg(long)]
    pub ttl: Option<i64>,

    /// Per-call cache mode (always, never)
    #[arg(long)]
    pub use_cache: Option<UseCache>,
}

/// Policy subcommands
#[derive(Subcommand, Debug)]
pub enum PolicyCommands {
    /// Validate the global cache policy
    Check {
        /// YAML config to check instead of the active one
        file: Option<String>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{}`", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("q=rust=fast").unwrap(),
            ("q".to_string(), "rust=fast".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
    }

    #[test]
    fn test_fetch_args() {
        let cli = Cli::try_parse_from([
            "hawkcache",
            "--session",
            "abc",
            "fetch",
            "/posts",
            "-p",
            "page=2",
            "--repeat",
            "3",
            "--use-cache",
            "always",
        ])
        .unwrap();

        assert_eq!(cli.session.as_deref(), Some("abc"));
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.url, "/posts");
                assert_eq!(args.params, vec![("page".to_string(), "2".to_string())]);
                assert_eq!(args.repeat, 3);
                assert_eq!(args.use_cache, Some(UseCache::Always));
                assert_eq!(args.ttl, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_invalid_use_cache_is_rejected() {
        let result = Cli::try_parse_from(["hawkcache", "fetch", "/a", "--use-cache", "sometimes"]);
        assert!(result.is_err());
    }
}
