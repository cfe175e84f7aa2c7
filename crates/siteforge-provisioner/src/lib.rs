//! siteforge-provisioner
//!
//! Convergence engine for static-website hosting stacks: a website
//! bucket, a CDN distribution in front of it, and optional DNS alias
//! records. Each run observes live state, diffs it against the desired
//! spec, and applies the resulting plan in dependency order.
//!
//! Public API:
//! - `reconcile()` — one full run: validate → observe → plan → execute
//! - `Providers` — the three provider boundaries a run talks to
//! - `aws::providers_from_env()` — wire the boundaries to AWS
//! - `EngineConfig` — retry policy and DNS fan-out width

pub mod aws;
pub mod config;
pub mod drivers;
pub mod observe;
pub mod orchestrate;
pub mod provider;
pub mod retry;

pub use crate::config::{EngineConfig, RetryPolicy};
pub use crate::observe::observe_stack;
pub use crate::orchestrate::reconcile;
pub use crate::provider::{
    BoxFuture, BucketProvider, DistributionConfig, DistributionProvider, DnsProvider, Providers,
};
pub use crate::retry::with_retry;
