use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::{BucketSpec, DistributionSpec, DnsRecordSpec, SiteSpec};

/// One violated rule, with the offending field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

/// All rules violated by a spec, collected in one pass. Never retried;
/// surfaced before any provider call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid site spec: {}", self.summary())]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A validated, normalized site spec. Hostnames are lowercased with any
/// trailing dot stripped; root objects are defaulted; the DNS record list
/// is expanded per alias domain (empty when DNS management is off).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedSpec {
    pub bucket: BucketSpec,
    pub distribution: DistributionSpec,
    pub dns_records: Vec<DnsRecordSpec>,
}

/// Validate and normalize a user-declared spec. Pure; collects every
/// violation rather than failing on the first.
pub fn validate(spec: &SiteSpec) -> Result<NormalizedSpec, ValidationError> {
    let mut violations = Vec::new();

    check_bucket(&spec.bucket, &mut violations);
    let distribution = check_distribution(&spec.distribution, &spec.bucket, &mut violations);

    if !violations.is_empty() {
        return Err(ValidationError { violations });
    }

    let dns_records = if spec.create_dns_records {
        distribution
            .alias_domains
            .iter()
            .map(|domain| DnsRecordSpec {
                domain_name: domain.clone(),
                create_record: true,
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut bucket = spec.bucket.clone();
    if bucket.root_object.is_empty() {
        bucket.root_object = crate::spec::default_root_object();
    }

    Ok(NormalizedSpec {
        bucket,
        distribution,
        dns_records,
    })
}

fn check_bucket(bucket: &BucketSpec, violations: &mut Vec<Violation>) {
    if let Some(message) = bucket_name_problem(&bucket.name) {
        violations.push(Violation {
            field: "bucket.name".into(),
            message,
        });
    }
    if bucket.region.is_empty() {
        violations.push(Violation {
            field: "bucket.region".into(),
            message: "region must not be empty".into(),
        });
    }
    if bucket.root_object.starts_with('/') {
        violations.push(Violation {
            field: "bucket.root_object".into(),
            message: "root object is an object key, not a path; drop the leading slash".into(),
        });
    }
}

fn check_distribution(
    dist: &DistributionSpec,
    bucket: &BucketSpec,
    violations: &mut Vec<Violation>,
) -> DistributionSpec {
    let mut dist = dist.clone();

    if dist.origin_bucket != bucket.name {
        violations.push(Violation {
            field: "distribution.origin_bucket".into(),
            message: format!(
                "origin bucket {:?} does not match the site bucket {:?}",
                dist.origin_bucket, bucket.name
            ),
        });
    }

    dist.alias_domains = dist
        .alias_domains
        .iter()
        .map(|d| normalize_hostname(d))
        .collect();

    if dist.alias_domains.is_empty() {
        violations.push(Violation {
            field: "distribution.alias_domains".into(),
            message: "at least one alias domain is required".into(),
        });
    }
    let mut seen = HashSet::new();
    for domain in &dist.alias_domains {
        if let Some(message) = hostname_problem(domain) {
            violations.push(Violation {
                field: "distribution.alias_domains".into(),
                message: format!("{domain:?}: {message}"),
            });
        }
        if !seen.insert(domain.clone()) {
            violations.push(Violation {
                field: "distribution.alias_domains".into(),
                message: format!("duplicate alias domain {domain:?}"),
            });
        }
    }

    if !well_formed_certificate_arn(&dist.certificate_arn) {
        violations.push(Violation {
            field: "distribution.certificate_arn".into(),
            message: format!(
                "{:?} is not an ACM certificate ARN (arn:aws:acm:<region>:<account>:certificate/<id>)",
                dist.certificate_arn
            ),
        });
    }

    if dist.default_ttl > dist.max_ttl {
        violations.push(Violation {
            field: "distribution.default_ttl".into(),
            message: format!(
                "default TTL {} exceeds max TTL {}",
                dist.default_ttl, dist.max_ttl
            ),
        });
    }

    if dist.root_object.is_empty() {
        dist.root_object = crate::spec::default_root_object();
    }
    if dist.root_object.starts_with('/') {
        violations.push(Violation {
            field: "distribution.root_object".into(),
            message: "root object is an object key, not a path; drop the leading slash".into(),
        });
    }

    let mut seen_events = HashSet::new();
    for binding in &dist.edge_functions {
        if !seen_events.insert(binding.event_type) {
            violations.push(Violation {
                field: "distribution.edge_functions".into(),
                message: format!(
                    "more than one binding for event type {}",
                    binding.event_type.as_str()
                ),
            });
        }
        if !binding.function_arn.starts_with("arn:aws:lambda:")
            || !binding.function_arn.contains(":function:")
        {
            violations.push(Violation {
                field: "distribution.edge_functions".into(),
                message: format!("{:?} is not a Lambda function ARN", binding.function_arn),
            });
        }
    }

    dist
}

/// S3 bucket naming rules: 3-63 chars, lowercase letters, digits, hyphens
/// and dots, starting and ending alphanumeric, no consecutive dots.
fn bucket_name_problem(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("bucket name must not be empty".into());
    }
    if name.len() < 3 || name.len() > 63 {
        return Some(format!(
            "bucket name must be 3-63 characters, got {}",
            name.len()
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Some("bucket name may only contain lowercase letters, digits, '-' and '.'".into());
    }
    let first = name.chars().next().unwrap_or(' ');
    let last = name.chars().last().unwrap_or(' ');
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Some("bucket name must start and end with a letter or digit".into());
    }
    if name.contains("..") {
        return Some("bucket name must not contain consecutive dots".into());
    }
    None
}

fn normalize_hostname(host: &str) -> String {
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn hostname_problem(host: &str) -> Option<&'static str> {
    if host.is_empty() {
        return Some("hostname must not be empty");
    }
    if host.len() > 253 {
        return Some("hostname exceeds 253 characters");
    }
    for label in host.split('.') {
        if label.is_empty() {
            return Some("hostname has an empty label");
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '*')
        {
            return Some("hostname has characters outside [a-z0-9-]");
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Some("hostname label starts or ends with '-'");
        }
    }
    None
}

fn well_formed_certificate_arn(arn: &str) -> bool {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    parts.len() == 6
        && parts[0] == "arn"
        && parts[1] == "aws"
        && parts[2] == "acm"
        && !parts[3].is_empty()
        && !parts[4].is_empty()
        && parts[5].starts_with("certificate/")
        && parts[5].len() > "certificate/".len()
}
