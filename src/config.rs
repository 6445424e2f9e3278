//! Core configuration
//!
//! Deserialized from the deployment's config file; every field has a default
//! so an empty document is a valid configuration.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the publishing core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkshopConfig {
    /// Index worker settings
    #[serde(default)]
    pub indexer: IndexerConfig,

    /// Alias names reserved by the bot's built-in commands
    #[serde(default)]
    pub builtin_commands: HashSet<String>,
}

/// Index worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Events drained per worker pass (default: 64)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Apply attempts per event per pass before backing off (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base retry delay in milliseconds (default: 100)
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Retry delay ceiling in milliseconds (default: 30_000)
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// Idle poll interval in milliseconds when the outbox is empty
    /// (default: 500)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_batch_size() -> usize {
    64
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    100
}

fn default_backoff_cap_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl IndexerConfig {
    /// Exponential backoff delay for the given retry attempt (0-based),
    /// capped at `backoff_cap_ms`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .backoff_base_ms
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        Duration::from_millis(exp.min(self.backoff_cap_ms))
    }

    /// Idle poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_valid_config() {
        let config: WorkshopConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.indexer.batch_size, 64);
        assert!(config.builtin_commands.is_empty());
    }

    #[test]
    fn test_partial_override() {
        let config: WorkshopConfig =
            serde_json::from_str(r#"{"indexer": {"max_attempts": 2}}"#).unwrap();
        assert_eq!(config.indexer.max_attempts, 2);
        assert_eq!(config.indexer.backoff_base_ms, 100);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = IndexerConfig::default();
        assert_eq!(config.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(config.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(800));
        assert_eq!(config.backoff_delay(30), Duration::from_millis(30_000));
        // Shift overflow saturates at the cap rather than wrapping.
        assert_eq!(config.backoff_delay(64), Duration::from_millis(30_000));
    }
}
