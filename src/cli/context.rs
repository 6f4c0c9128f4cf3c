//! Command execution context
//!
//! Loads the config, applies CLI overrides and assembles the cached HTTP
//! pipeline every networked command runs through.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use hawkcache::cache::{SessionIdProvider, SessionRegistry, cache_interceptors};
use hawkcache::client::{AcceptLanguageInterceptor, HttpPipeline, HttpTransport};
use hawkcache::config::Config;
use hawkcache::error::ConfigError;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;

/// Context for command execution containing config, pipeline and output options.
pub struct CommandContext {
    /// Loaded configuration with CLI overrides applied
    pub config: Config,
    /// Pipeline with the language and cache interceptors installed
    pub pipeline: HttpPipeline<HttpTransport>,
    /// Registry shared by the cache interceptors
    pub registry: Arc<SessionRegistry>,
    /// Output format preference
    pub format: OutputFormat,
}

impl CommandContext {
    /// Create a new command context.
    ///
    /// # Errors
    /// Returns error if config cannot be loaded, no base URL is known, or the
    /// global cache policy is invalid.
    pub fn new(opts: &GlobalOptions) -> anyhow::Result<Self> {
        let mut config = Config::load_at(opts.config_ref())?;

        if let Some(base_url) = opts.base_url_ref() {
            config.base_url = Some(base_url.to_string());
        }
        if let Some(session) = opts.session_ref() {
            config.session_id = Some(session.to_string());
        }

        let base_url = config.base_url.clone().ok_or_else(|| {
            ConfigError::Invalid("No base URL configured; set base_url or pass --base-url".to_string())
        })?;

        let mut transport =
            HttpTransport::with_timeout(base_url, Duration::from_secs(config.timeout_secs))?;
        if let Some(prefix) = &config.json_prefix {
            transport = transport.with_json_prefix(prefix.clone());
        }

        let pipeline = HttpPipeline::new(transport);
        if let Some(lang) = &config.lang {
            pipeline.add_request_interceptor(AcceptLanguageInterceptor::new(lang));
        }

        let registry = Arc::new(SessionRegistry::new());
        let session_id = config.session_id.clone().unwrap_or_default();
        let provider: SessionIdProvider = Arc::new(move || session_id.clone());

        let global = config.cache_options()?;
        let (request, response) = cache_interceptors(registry.clone(), provider, &global)
            .context("Invalid global cache policy")?;
        pipeline.add_request_interceptor(request);
        pipeline.add_response_interceptor(response);

        log::debug!(
            "Pipeline ready for {} (session {:?})",
            pipeline.transport().base_url(),
            config.session_id
        );

        Ok(Self {
            config,
            pipeline,
            registry,
            format: opts.format,
        })
    }
}
