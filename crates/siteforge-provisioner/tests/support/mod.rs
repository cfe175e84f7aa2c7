//! In-memory fake providers for engine tests. Each fake records its calls
//! in a shared log so tests can assert ordering, and takes queued errors
//! to inject provider failures.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use siteforge_core::error::ProviderError;
use siteforge_core::observed::{
    DeployStatus, DistributionHandle, ObservedBucket, ObservedDistribution, ObservedDnsRecord,
};
use siteforge_core::spec::{BucketSpec, DistributionSpec, PriceClass, SiteSpec, TlsPolicy};
use siteforge_provisioner::provider::{
    BoxFuture, BucketProvider, DistributionConfig, DistributionProvider, DnsProvider, Providers,
};
use siteforge_provisioner::{EngineConfig, RetryPolicy};

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn site_spec() -> SiteSpec {
    SiteSpec {
        bucket: BucketSpec {
            name: "example-site".to_string(),
            region: "eu-west-1".to_string(),
            root_object: "index.html".to_string(),
            error_object: None,
        },
        distribution: DistributionSpec {
            origin_bucket: "example-site".to_string(),
            alias_domains: vec!["www.example.com".to_string()],
            certificate_arn: "arn:aws:acm:us-east-1:123456789012:certificate/abc-123".to_string(),
            default_ttl: 3600,
            max_ttl: 86400,
            price_class: PriceClass::UsEurope,
            tls_policy: TlsPolicy::TlsV12_2021,
            root_object: "index.html".to_string(),
            edge_functions: vec![],
        },
        create_dns_records: true,
    }
}

/// Millisecond-scale backoff so retry paths stay fast under test.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        retry: RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        },
        dns_concurrency: 4,
    }
}

pub struct Fakes {
    pub log: CallLog,
    pub bucket: Arc<FakeBucket>,
    pub distribution: Arc<FakeDistribution>,
    pub dns: Arc<FakeDns>,
}

impl Fakes {
    pub fn empty() -> Self {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        Fakes {
            bucket: Arc::new(FakeBucket::new(log.clone())),
            distribution: Arc::new(FakeDistribution::new(log.clone())),
            dns: Arc::new(FakeDns::new(log.clone())),
            log,
        }
    }

    /// Fakes pre-seeded with a stack that already matches `site_spec()`.
    pub fn converged() -> Self {
        let fakes = Fakes::empty();
        let spec = site_spec();
        *fakes.bucket.existing.lock().unwrap() = Some(ObservedBucket {
            region: spec.bucket.region.clone(),
            root_object: Some(spec.bucket.root_object.clone()),
            error_object: None,
            public_read: true,
            cors_read: true,
        });
        *fakes.distribution.state.lock().unwrap() = Some(ObservedDistribution {
            id: "EFAKE".to_string(),
            domain_name: "dfake123.cloudfront.net".to_string(),
            status: DeployStatus::Deployed,
            version_token: "ETAG1".to_string(),
            origin_domain: spec.bucket.website_endpoint(),
            alias_domains: spec.distribution.alias_domains.clone(),
            certificate_arn: Some(spec.distribution.certificate_arn.clone()),
            default_ttl: spec.distribution.default_ttl,
            max_ttl: spec.distribution.max_ttl,
            price_class: spec.distribution.price_class.as_str().to_string(),
            tls_policy: spec.distribution.tls_policy.as_str().to_string(),
            root_object: spec.distribution.root_object.clone(),
            edge_functions: vec![],
        });
        fakes.dns.records.lock().unwrap().insert(
            "www.example.com".to_string(),
            ObservedDnsRecord {
                domain_name: "www.example.com".to_string(),
                alias_target: "dfake123.cloudfront.net".to_string(),
            },
        );
        fakes
    }

    pub fn providers(&self) -> Providers {
        Providers {
            bucket: self.bucket.clone(),
            distribution: self.distribution.clone(),
            dns: self.dns.clone(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Calls that would change provider state, in order.
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                !matches!(
                    c.split_whitespace().next().unwrap_or(""),
                    "bucket.describe" | "distribution.list" | "distribution.get" | "dns.find"
                )
            })
            .collect()
    }
}

pub struct FakeBucket {
    log: CallLog,
    pub existing: Mutex<Option<ObservedBucket>>,
    /// Errors returned from `create`, in order, before it succeeds.
    pub create_failures: Mutex<Vec<ProviderError>>,
    /// Error returned from every `put_policy` call.
    pub policy_failure: Mutex<Option<ProviderError>>,
}

impl FakeBucket {
    fn new(log: CallLog) -> Self {
        FakeBucket {
            log,
            existing: Mutex::new(None),
            create_failures: Mutex::new(Vec::new()),
            policy_failure: Mutex::new(None),
        }
    }

    fn record(&self, call: &str) {
        self.log.lock().unwrap().push(call.to_string());
    }
}

impl BucketProvider for FakeBucket {
    fn describe(&self, _name: &str) -> BoxFuture<'_, Result<ObservedBucket, ProviderError>> {
        self.record("bucket.describe");
        let result = self
            .existing
            .lock()
            .unwrap()
            .clone()
            .ok_or(ProviderError::NotFound);
        Box::pin(async move { result })
    }

    fn create(&self, _name: &str, region: &str) -> BoxFuture<'_, Result<(), ProviderError>> {
        self.record("bucket.create");
        let mut failures = self.create_failures.lock().unwrap();
        let result = if failures.is_empty() {
            *self.existing.lock().unwrap() = Some(ObservedBucket {
                region: region.to_string(),
                root_object: None,
                error_object: None,
                public_read: false,
                cors_read: false,
            });
            Ok(())
        } else {
            Err(failures.remove(0))
        };
        Box::pin(async move { result })
    }

    fn allow_public_policy(&self, _name: &str) -> BoxFuture<'_, Result<(), ProviderError>> {
        self.record("bucket.allow_public_policy");
        Box::pin(async move { Ok(()) })
    }

    fn put_website(
        &self,
        _name: &str,
        root_object: &str,
        error_object: Option<&str>,
    ) -> BoxFuture<'_, Result<(), ProviderError>> {
        self.record("bucket.put_website");
        if let Some(bucket) = self.existing.lock().unwrap().as_mut() {
            bucket.root_object = Some(root_object.to_string());
            bucket.error_object = error_object.map(str::to_string);
        }
        Box::pin(async move { Ok(()) })
    }

    fn put_policy(
        &self,
        _name: &str,
        _policy_json: &str,
    ) -> BoxFuture<'_, Result<(), ProviderError>> {
        self.record("bucket.put_policy");
        let result = match self.policy_failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => {
                if let Some(bucket) = self.existing.lock().unwrap().as_mut() {
                    bucket.public_read = true;
                }
                Ok(())
            }
        };
        Box::pin(async move { result })
    }

    fn put_read_cors(&self, _name: &str) -> BoxFuture<'_, Result<(), ProviderError>> {
        self.record("bucket.put_read_cors");
        if let Some(bucket) = self.existing.lock().unwrap().as_mut() {
            bucket.cors_read = true;
        }
        Box::pin(async move { Ok(()) })
    }
}

pub struct FakeDistribution {
    log: CallLog,
    pub state: Mutex<Option<ObservedDistribution>>,
    /// Extra listing entries, for ambiguity scenarios.
    pub extra_handles: Mutex<Vec<DistributionHandle>>,
    pub create_failures: Mutex<Vec<ProviderError>>,
    /// Errors returned from `update`, in order, before it succeeds. An
    /// injected conflict also bumps the stored version token, simulating
    /// the concurrent writer that caused it.
    pub update_failures: Mutex<Vec<ProviderError>>,
}

impl FakeDistribution {
    fn new(log: CallLog) -> Self {
        FakeDistribution {
            log,
            state: Mutex::new(None),
            extra_handles: Mutex::new(Vec::new()),
            create_failures: Mutex::new(Vec::new()),
            update_failures: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: &str) {
        self.log.lock().unwrap().push(call.to_string());
    }

    fn apply_config(dist: &mut ObservedDistribution, config: &DistributionConfig) {
        dist.origin_domain = config.origin_domain.clone();
        dist.alias_domains = config.alias_domains.clone();
        dist.certificate_arn = Some(config.certificate_arn.clone());
        dist.default_ttl = config.default_ttl;
        dist.max_ttl = config.max_ttl;
        dist.price_class = config.price_class.clone();
        dist.tls_policy = config.tls_policy.clone();
        dist.root_object = config.root_object.clone();
        dist.edge_functions = config.edge_functions.clone();
    }
}

impl DistributionProvider for FakeDistribution {
    fn list(&self) -> BoxFuture<'_, Result<Vec<DistributionHandle>, ProviderError>> {
        self.record("distribution.list");
        let mut handles = self.extra_handles.lock().unwrap().clone();
        if let Some(dist) = self.state.lock().unwrap().as_ref() {
            handles.push(DistributionHandle {
                id: dist.id.clone(),
                origin_domain: dist.origin_domain.clone(),
            });
        }
        Box::pin(async move { Ok(handles) })
    }

    fn get(&self, id: &str) -> BoxFuture<'_, Result<ObservedDistribution, ProviderError>> {
        self.record("distribution.get");
        let result = match self.state.lock().unwrap().as_ref() {
            Some(dist) if dist.id == id => Ok(dist.clone()),
            _ => Err(ProviderError::NotFound),
        };
        Box::pin(async move { result })
    }

    fn create(
        &self,
        config: &DistributionConfig,
    ) -> BoxFuture<'_, Result<ObservedDistribution, ProviderError>> {
        self.record("distribution.create");
        let mut failures = self.create_failures.lock().unwrap();
        let result = if failures.is_empty() {
            let mut dist = ObservedDistribution {
                id: "EFAKE".to_string(),
                domain_name: "dfake123.cloudfront.net".to_string(),
                status: DeployStatus::Pending,
                version_token: "ETAG1".to_string(),
                origin_domain: String::new(),
                alias_domains: vec![],
                certificate_arn: None,
                default_ttl: 0,
                max_ttl: 0,
                price_class: String::new(),
                tls_policy: String::new(),
                root_object: String::new(),
                edge_functions: vec![],
            };
            Self::apply_config(&mut dist, config);
            *self.state.lock().unwrap() = Some(dist.clone());
            Ok(dist)
        } else {
            Err(failures.remove(0))
        };
        Box::pin(async move { result })
    }

    fn update(
        &self,
        id: &str,
        config: &DistributionConfig,
        version_token: &str,
    ) -> BoxFuture<'_, Result<ObservedDistribution, ProviderError>> {
        self.record("distribution.update");
        let mut failures = self.update_failures.lock().unwrap();
        let result = if !failures.is_empty() {
            let err = failures.remove(0);
            if matches!(err, ProviderError::Conflict { .. }) {
                if let Some(dist) = self.state.lock().unwrap().as_mut() {
                    dist.version_token = format!("{}x", dist.version_token);
                }
            }
            Err(err)
        } else {
            let mut state = self.state.lock().unwrap();
            match state.as_mut() {
                Some(dist) if dist.id == id => {
                    if dist.version_token != version_token {
                        Err(ProviderError::Conflict {
                            token: version_token.to_string(),
                        })
                    } else {
                        Self::apply_config(dist, config);
                        dist.version_token = format!("{}x", dist.version_token);
                        dist.status = DeployStatus::Pending;
                        Ok(dist.clone())
                    }
                }
                _ => Err(ProviderError::NotFound),
            }
        };
        Box::pin(async move { result })
    }
}

pub struct FakeDns {
    log: CallLog,
    pub records: Mutex<BTreeMap<String, ObservedDnsRecord>>,
    /// Domains whose upserts always fail with the given error.
    pub fail_domains: Mutex<BTreeMap<String, ProviderError>>,
}

impl FakeDns {
    fn new(log: CallLog) -> Self {
        FakeDns {
            log,
            records: Mutex::new(BTreeMap::new()),
            fail_domains: Mutex::new(BTreeMap::new()),
        }
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }
}

impl DnsProvider for FakeDns {
    fn find_alias(&self, domain: &str) -> BoxFuture<'_, Result<ObservedDnsRecord, ProviderError>> {
        self.record(format!("dns.find {domain}"));
        let result = self
            .records
            .lock()
            .unwrap()
            .get(domain)
            .cloned()
            .ok_or(ProviderError::NotFound);
        Box::pin(async move { result })
    }

    fn upsert_alias(
        &self,
        domain: &str,
        target: &str,
    ) -> BoxFuture<'_, Result<(), ProviderError>> {
        self.record(format!("dns.upsert {domain}"));
        let result = match self.fail_domains.lock().unwrap().get(domain).cloned() {
            Some(err) => Err(err),
            None => {
                self.records.lock().unwrap().insert(
                    domain.to_string(),
                    ObservedDnsRecord {
                        domain_name: domain.to_string(),
                        alias_target: target.to_string(),
                    },
                );
                Ok(())
            }
        };
        Box::pin(async move { result })
    }
}
