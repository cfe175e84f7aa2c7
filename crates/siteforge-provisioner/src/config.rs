use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded exponential backoff for transient provider errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Tunables for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Worker-pool bound for per-domain DNS upserts.
    #[serde(default = "default_dns_concurrency")]
    pub dns_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            retry: RetryPolicy::default(),
            dns_concurrency: default_dns_concurrency(),
        }
    }
}

fn default_dns_concurrency() -> usize {
    4
}
