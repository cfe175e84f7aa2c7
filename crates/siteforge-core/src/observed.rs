use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::spec::EdgeFunctionBinding;

/// Deployment status of a distribution as reported by the provider.
/// A Pending distribution is not safely updatable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    Pending,
    Deployed,
    Failed,
}

impl DeployStatus {
    /// CloudFront reports "InProgress" until the configuration has
    /// propagated to every edge location.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "Deployed" => DeployStatus::Deployed,
            "InProgress" => DeployStatus::Pending,
            _ => DeployStatus::Failed,
        }
    }
}

/// Live state of the website bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedBucket {
    pub region: String,
    /// Index document suffix, when website hosting is configured.
    pub root_object: Option<String>,
    pub error_object: Option<String>,
    /// Whether the managed public-read policy is attached.
    pub public_read: bool,
    /// Whether the managed read CORS configuration is attached.
    pub cors_read: bool,
}

/// Cheap listing handle for a distribution: enough to match on origin
/// without fetching the full configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionHandle {
    pub id: String,
    pub origin_domain: String,
}

/// Live state of a distribution, including the opaque version token
/// required for a safe read-modify-write update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedDistribution {
    pub id: String,
    /// Provider-assigned domain, e.g. "d111111abcdef8.cloudfront.net".
    pub domain_name: String,
    pub status: DeployStatus,
    pub version_token: String,
    pub origin_domain: String,
    pub alias_domains: Vec<String>,
    pub certificate_arn: Option<String>,
    pub default_ttl: u64,
    pub max_ttl: u64,
    /// Wire-format price class, e.g. "PriceClass_100".
    pub price_class: String,
    /// Wire-format minimum TLS protocol, e.g. "TLSv1.2_2021".
    pub tls_policy: String,
    pub root_object: String,
    pub edge_functions: Vec<EdgeFunctionBinding>,
}

/// Live state of one DNS alias record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedDnsRecord {
    pub domain_name: String,
    /// Domain the alias currently points at.
    pub alias_target: String,
}

/// One observation pass over every resource in the site. `None` means the
/// resource does not exist yet — an expected state on first run, never an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedStack {
    pub bucket: Option<ObservedBucket>,
    pub distribution: Option<ObservedDistribution>,
    /// Keyed by alias domain; `None` means no record exists for it.
    pub dns_records: BTreeMap<String, Option<ObservedDnsRecord>>,
}
