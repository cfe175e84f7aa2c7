use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use siteforge_core::error::ProviderError;
use siteforge_core::observed::{
    DistributionHandle, ObservedBucket, ObservedDistribution, ObservedDnsRecord,
};
use siteforge_core::spec::EdgeFunctionBinding;
use siteforge_core::validate::NormalizedSpec;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// SDK-shaped boundary for the website bucket. One method per provider
/// call; the bucket driver composes them. Implementations clone borrowed
/// arguments before building their futures.
pub trait BucketProvider: Send + Sync {
    /// Full snapshot of the bucket's managed settings.
    /// `Err(NotFound)` when the bucket does not exist.
    fn describe(&self, name: &str) -> BoxFuture<'_, Result<ObservedBucket, ProviderError>>;

    /// Create the bucket. Creating a bucket this account already owns is
    /// success, not an error.
    fn create(&self, name: &str, region: &str) -> BoxFuture<'_, Result<(), ProviderError>>;

    /// Lift the account-level public-access block so a public-read policy
    /// can attach.
    fn allow_public_policy(&self, name: &str) -> BoxFuture<'_, Result<(), ProviderError>>;

    fn put_website(
        &self,
        name: &str,
        root_object: &str,
        error_object: Option<&str>,
    ) -> BoxFuture<'_, Result<(), ProviderError>>;

    /// Replace the bucket policy wholesale.
    fn put_policy(&self, name: &str, policy_json: &str)
    -> BoxFuture<'_, Result<(), ProviderError>>;

    /// Replace the CORS configuration with a permissive read-only rule.
    fn put_read_cors(&self, name: &str) -> BoxFuture<'_, Result<(), ProviderError>>;
}

/// Everything the engine controls in a distribution's configuration.
/// Rendered from the normalized spec; uncontrolled fields (logging, WAF,
/// restrictions, extra cache behaviors) are left to the provider's current
/// values on update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionConfig {
    /// Deterministic, derived from the origin bucket, so provider-side
    /// creation is idempotent across racing or resumed runs.
    pub caller_reference: String,
    pub origin_domain: String,
    pub alias_domains: Vec<String>,
    pub certificate_arn: String,
    pub default_ttl: u64,
    pub max_ttl: u64,
    /// Wire format, e.g. "PriceClass_100".
    pub price_class: String,
    /// Wire format, e.g. "TLSv1.2_2021".
    pub tls_policy: String,
    pub root_object: String,
    pub comment: String,
    pub edge_functions: Vec<EdgeFunctionBinding>,
}

impl DistributionConfig {
    pub fn from_spec(spec: &NormalizedSpec) -> Self {
        let dist = &spec.distribution;
        DistributionConfig {
            caller_reference: format!("siteforge-{}", spec.bucket.name),
            origin_domain: spec.bucket.website_endpoint(),
            alias_domains: dist.alias_domains.clone(),
            certificate_arn: dist.certificate_arn.clone(),
            default_ttl: dist.default_ttl,
            max_ttl: dist.max_ttl,
            price_class: dist.price_class.as_str().to_string(),
            tls_policy: dist.tls_policy.as_str().to_string(),
            root_object: dist.root_object.clone(),
            comment: format!("siteforge static site for {}", spec.bucket.name),
            edge_functions: dist.edge_functions.clone(),
        }
    }
}

/// SDK-shaped boundary for the content-delivery distribution.
pub trait DistributionProvider: Send + Sync {
    /// Listing handles for every distribution in the account. Distributions
    /// are not indexed by origin; the observer does the matching.
    fn list(&self) -> BoxFuture<'_, Result<Vec<DistributionHandle>, ProviderError>>;

    /// Full state of one distribution, including its version token.
    fn get(&self, id: &str) -> BoxFuture<'_, Result<ObservedDistribution, ProviderError>>;

    /// Submit a new distribution. Returns the provider-assigned state with
    /// status Pending; creation never waits for deployment to settle.
    fn create(
        &self,
        config: &DistributionConfig,
    ) -> BoxFuture<'_, Result<ObservedDistribution, ProviderError>>;

    /// Read-modify-write: fetch the current full configuration server-side,
    /// merge in the controlled fields, submit with `version_token`.
    /// `Err(Conflict)` when the token no longer matches.
    fn update(
        &self,
        id: &str,
        config: &DistributionConfig,
        version_token: &str,
    ) -> BoxFuture<'_, Result<ObservedDistribution, ProviderError>>;
}

/// SDK-shaped boundary for DNS alias records.
pub trait DnsProvider: Send + Sync {
    /// The existing alias record for a domain, `Err(NotFound)` when absent
    /// (including when no hosted zone covers the domain).
    fn find_alias(&self, domain: &str) -> BoxFuture<'_, Result<ObservedDnsRecord, ProviderError>>;

    /// Upsert an alias record pointing `domain` at `target`.
    fn upsert_alias(&self, domain: &str, target: &str)
    -> BoxFuture<'_, Result<(), ProviderError>>;
}

/// The three provider boundaries bundled for one run.
#[derive(Clone)]
pub struct Providers {
    pub bucket: Arc<dyn BucketProvider>,
    pub distribution: Arc<dyn DistributionProvider>,
    pub dns: Arc<dyn DnsProvider>,
}
