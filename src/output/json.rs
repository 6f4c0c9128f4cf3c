//! JSON output formatting

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Wrapper for JSON output with metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T> {
    pub data: T,
    pub meta: Metadata,
}

/// Metadata included in JSON output
#[derive(Debug, Serialize, Deserialize)]
pub struct Metadata {
    /// When the output was produced
    pub timestamp: String,

    /// CLI version
    pub version: String,
}

impl<T> JsonOutput<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: Metadata {
                timestamp: Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

/// Format data as pretty-printed JSON
pub fn format_json<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonOutput::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hawkcache::cache::{CachePolicy, PartialPolicy, UseCache};

    #[test]
    fn test_policy_summary_as_json() {
        let policy = CachePolicy::global(
            &PartialPolicy::new()
                .use_cache(UseCache::Always)
                .time_to_live_ms(5000),
        )
        .unwrap();

        let result = format_json(&policy.summary()).unwrap();

        assert!(result.contains("\"useCache\": \"always\""));
        assert!(result.contains("\"timeToLiveMs\": 5000"));
        assert!(result.contains("\"version\""));
        assert!(!result.contains("invalidateUrls"));
    }

    #[test]
    fn test_format_json_empty_vec() {
        let items: Vec<String> = vec![];
        let result = format_json(&items).unwrap();
        assert!(result.contains("\"data\": []"));
    }
}
