//! Replay command implementation
//!
//! Runs a scripted list of calls through one pipeline, so cache hits,
//! expiry and invalidation can be observed across steps:
//!
//! ```yaml
//! - url: /posts
//! - url: /posts
//!   wait_ms: 1500
//! - method: post
//!   url: /posts
//!   body: {title: hello}
//!   cache_options: {invalidateUrlsRegex: "^/users"}
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use hawkcache::{Call, PartialPolicy};

use crate::cli::args::GlobalOptions;
use crate::cli::CommandContext;
use crate::output::{CallRow, Formattable};

/// One scripted call
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(default = "default_method")]
    pub method: String,

    pub url: String,

    /// Query parameters, in the order written
    #[serde(default)]
    pub params: serde_yaml::Mapping,

    #[serde(default)]
    pub body: Option<Value>,

    /// Per-call cache options bag
    #[serde(default)]
    pub cache_options: Option<Value>,

    /// Pause before issuing the call
    #[serde(default)]
    pub wait_ms: Option<u64>,
}

fn default_method() -> String {
    "get".to_string()
}

impl Step {
    /// Build the call for this step.
    ///
    /// A cache options bag that is not an object is dropped with a warning.
    /// Badly typed fields inside it are left for the cache interceptors, which
    /// fall back to the global policy.
    pub fn to_call(&self) -> anyhow::Result<Call> {
        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .with_context(|| format!("Invalid method `{}`", self.method))?;

        let mut call = Call::new(method, &self.url);
        for (key, value) in &self.params {
            call = call.param(scalar_text(key), scalar_text(value));
        }
        if let Some(body) = &self.body {
            call = call.body(body.clone());
        }
        if let Some(bag) = &self.cache_options {
            match PartialPolicy::from_value(bag) {
                Ok(options) => call = call.cache_options(options),
                Err(e) => log::warn!("Ignoring cache options for {}: {}", self.url, e),
            }
        }
        Ok(call)
    }
}

/// Query-string text for a YAML scalar
fn scalar_text(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Parse a steps file
pub fn load_steps(path: &Path) -> anyhow::Result<Vec<Step>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let steps: Vec<Step> = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(steps)
}

/// Run the replay command
pub async fn run(opts: &GlobalOptions, file: &str) -> anyhow::Result<()> {
    let steps = load_steps(Path::new(file))?;
    let ctx = CommandContext::new(opts)?;

    let mut rows = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        if let Some(wait) = step.wait_ms {
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
        let response = ctx
            .pipeline
            .request(step.to_call()?)
            .await
            .with_context(|| format!("Step {} ({} {}) failed", index + 1, step.method, step.url))?;
        rows.push(CallRow::from_response(index + 1, &response));
    }

    log::debug!(
        "Replayed {} steps for session {:?}",
        rows.len(),
        ctx.registry.current_session()
    );

    rows.print(ctx.format)
}
