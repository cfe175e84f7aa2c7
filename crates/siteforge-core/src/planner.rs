use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::observed::{DeployStatus, ObservedBucket, ObservedDistribution, ObservedStack};
use crate::spec::DistributionSpec;
use crate::validate::NormalizedSpec;

/// Structured before/after for a single field that does not match desired
/// state. Attached to plan entries for diagnosability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDrift {
    pub field: String,
    pub expected: Value,
    pub actual: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketOp {
    Create,
    /// Website configuration, policy and CORS are re-put wholesale; these
    /// settings have no partial-update semantics.
    Replace,
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionOp {
    Create,
    /// Read-modify-write against the version token captured at observation
    /// time. A token mismatch at execution time is a conflict.
    Update { id: String, version_token: String },
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsOp {
    Create,
    Update,
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedBucket {
    pub op: BucketOp,
    pub drift: Vec<FieldDrift>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedDistribution {
    pub op: DistributionOp,
    /// Set when the observed distribution is still Pending: the operation
    /// is computed but must not execute until the provider settles.
    pub blocked: bool,
    pub drift: Vec<FieldDrift>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedDns {
    pub domain_name: String,
    pub op: DnsOp,
}

/// The full ordered plan for one reconciliation run. Execution order is
/// fixed: bucket, then distribution, then DNS — each downstream resource
/// depends on its upstream. The DNS target value (the distribution's
/// assigned domain) is bound at execution time, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcilePlan {
    pub bucket: PlannedBucket,
    pub distribution: PlannedDistribution,
    pub dns: Vec<PlannedDns>,
}

impl ReconcilePlan {
    pub fn has_changes(&self) -> bool {
        self.bucket.op != BucketOp::NoOp
            || self.distribution.op != DistributionOp::NoOp
            || self.dns.iter().any(|d| d.op != DnsOp::NoOp)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    /// The bucket exists in a different region. Regions cannot change in
    /// place, so this is a hard conflict rather than an update.
    #[error(
        "bucket {name} exists in region {actual} but the spec wants {desired}; \
         bucket regions cannot change in place"
    )]
    RegionConflict {
        name: String,
        desired: String,
        actual: String,
    },
}

/// Diff desired against observed state and produce the run's plan.
/// Pure and deterministic: the same inputs always yield the same plan.
pub fn plan(desired: &NormalizedSpec, observed: &ObservedStack) -> Result<ReconcilePlan, PlanError> {
    let bucket = plan_bucket(desired, observed.bucket.as_ref())?;
    let distribution = plan_distribution(desired, observed.distribution.as_ref());
    let dns = plan_dns(desired, observed, &distribution.op);

    Ok(ReconcilePlan {
        bucket,
        distribution,
        dns,
    })
}

fn plan_bucket(
    desired: &NormalizedSpec,
    observed: Option<&ObservedBucket>,
) -> Result<PlannedBucket, PlanError> {
    let Some(observed) = observed else {
        return Ok(PlannedBucket {
            op: BucketOp::Create,
            drift: vec![],
        });
    };

    if observed.region != desired.bucket.region {
        return Err(PlanError::RegionConflict {
            name: desired.bucket.name.clone(),
            desired: desired.bucket.region.clone(),
            actual: observed.region.clone(),
        });
    }

    let drift = diff_bucket(desired, observed);
    let op = if drift.is_empty() {
        BucketOp::NoOp
    } else {
        BucketOp::Replace
    };
    Ok(PlannedBucket { op, drift })
}

fn diff_bucket(desired: &NormalizedSpec, observed: &ObservedBucket) -> Vec<FieldDrift> {
    let mut drift = Vec::new();
    let spec = &desired.bucket;

    push_drift(
        &mut drift,
        "root_object",
        json!(spec.root_object),
        json!(observed.root_object),
        observed.root_object.as_deref() == Some(spec.root_object.as_str()),
    );
    push_drift(
        &mut drift,
        "error_object",
        json!(spec.error_object),
        json!(observed.error_object),
        observed.error_object == spec.error_object,
    );
    push_drift(
        &mut drift,
        "public_read",
        json!(true),
        json!(observed.public_read),
        observed.public_read,
    );
    push_drift(
        &mut drift,
        "cors_read",
        json!(true),
        json!(observed.cors_read),
        observed.cors_read,
    );

    drift
}

fn plan_distribution(
    desired: &NormalizedSpec,
    observed: Option<&ObservedDistribution>,
) -> PlannedDistribution {
    let Some(observed) = observed else {
        return PlannedDistribution {
            op: DistributionOp::Create,
            blocked: false,
            drift: vec![],
        };
    };

    let drift = diff_distribution(desired, observed);
    let op = if drift.is_empty() {
        DistributionOp::NoOp
    } else {
        DistributionOp::Update {
            id: observed.id.clone(),
            version_token: observed.version_token.clone(),
        }
    };

    PlannedDistribution {
        op,
        blocked: observed.status == DeployStatus::Pending,
        drift,
    }
}

/// Field-by-field semantic comparison, ignoring provider-assigned values
/// (id, ARN, assigned domain). Alias and edge-function order is not
/// significant.
fn diff_distribution(desired: &NormalizedSpec, observed: &ObservedDistribution) -> Vec<FieldDrift> {
    let mut drift = Vec::new();
    let spec: &DistributionSpec = &desired.distribution;

    let origin = desired.bucket.website_endpoint();
    push_drift(
        &mut drift,
        "origin_domain",
        json!(origin),
        json!(observed.origin_domain),
        observed.origin_domain.eq_ignore_ascii_case(&origin),
    );

    let mut want_aliases = spec.alias_domains.clone();
    want_aliases.sort();
    let mut have_aliases: Vec<String> = observed
        .alias_domains
        .iter()
        .map(|a| a.trim_end_matches('.').to_ascii_lowercase())
        .collect();
    have_aliases.sort();
    push_drift(
        &mut drift,
        "alias_domains",
        json!(want_aliases),
        json!(have_aliases),
        want_aliases == have_aliases,
    );

    push_drift(
        &mut drift,
        "certificate_arn",
        json!(spec.certificate_arn),
        json!(observed.certificate_arn),
        observed.certificate_arn.as_deref() == Some(spec.certificate_arn.as_str()),
    );
    push_drift(
        &mut drift,
        "default_ttl",
        json!(spec.default_ttl),
        json!(observed.default_ttl),
        observed.default_ttl == spec.default_ttl,
    );
    push_drift(
        &mut drift,
        "max_ttl",
        json!(spec.max_ttl),
        json!(observed.max_ttl),
        observed.max_ttl == spec.max_ttl,
    );
    push_drift(
        &mut drift,
        "price_class",
        json!(spec.price_class.as_str()),
        json!(observed.price_class),
        observed.price_class == spec.price_class.as_str(),
    );
    push_drift(
        &mut drift,
        "tls_policy",
        json!(spec.tls_policy.as_str()),
        json!(observed.tls_policy),
        observed.tls_policy == spec.tls_policy.as_str(),
    );
    push_drift(
        &mut drift,
        "root_object",
        json!(spec.root_object),
        json!(observed.root_object),
        observed.root_object == spec.root_object,
    );

    let mut want_bindings: Vec<(&'static str, &str)> = spec
        .edge_functions
        .iter()
        .map(|b| (b.event_type.as_str(), b.function_arn.as_str()))
        .collect();
    want_bindings.sort();
    let mut have_bindings: Vec<(&'static str, &str)> = observed
        .edge_functions
        .iter()
        .map(|b| (b.event_type.as_str(), b.function_arn.as_str()))
        .collect();
    have_bindings.sort();
    push_drift(
        &mut drift,
        "edge_functions",
        json!(want_bindings),
        json!(have_bindings),
        want_bindings == have_bindings,
    );

    drift
}

fn plan_dns(
    desired: &NormalizedSpec,
    observed: &ObservedStack,
    distribution_op: &DistributionOp,
) -> Vec<PlannedDns> {
    desired
        .dns_records
        .iter()
        .filter(|r| r.create_record)
        .map(|record| {
            let existing = observed
                .dns_records
                .get(&record.domain_name)
                .and_then(|r| r.as_ref());

            let op = match existing {
                None => DnsOp::Create,
                // A freshly created distribution gets a new assigned domain,
                // so every record must be re-pointed.
                Some(_) if *distribution_op == DistributionOp::Create => DnsOp::Update,
                Some(existing) => {
                    let target_matches = observed.distribution.as_ref().is_some_and(|d| {
                        existing
                            .alias_target
                            .trim_end_matches('.')
                            .eq_ignore_ascii_case(d.domain_name.trim_end_matches('.'))
                    });
                    if target_matches {
                        DnsOp::NoOp
                    } else {
                        DnsOp::Update
                    }
                }
            };

            PlannedDns {
                domain_name: record.domain_name.clone(),
                op,
            }
        })
        .collect()
}

fn push_drift(drift: &mut Vec<FieldDrift>, field: &str, expected: Value, actual: Value, ok: bool) {
    if !ok {
        drift.push(FieldDrift {
            field: field.to_string(),
            expected,
            actual,
        });
    }
}
