//! Cached response payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored response body plus the instant it was written.
///
/// Entries are replaced wholesale on overwrite, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Opaque response data
    pub data: Value,

    /// When the entry was written
    pub written_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(data: Value, written_at: DateTime<Utc>) -> Self {
        Self { data, written_at }
    }

    /// Age in milliseconds at `now` (never negative)
    pub fn age_millis(&self, now: DateTime<Utc>) -> i64 {
        (now - self.written_at).num_milliseconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_age_millis() {
        let written = Utc::now();
        let entry = CacheEntry::new(json!({"some": "data"}), written);

        let later = written + chrono::Duration::milliseconds(1500);
        assert_eq!(entry.age_millis(later), 1500);
    }

    #[test]
    fn test_age_never_negative() {
        let written = Utc::now();
        let entry = CacheEntry::new(json!(null), written);

        let earlier = written - chrono::Duration::seconds(5);
        assert_eq!(entry.age_millis(earlier), 0);
    }
}
