mod support;

use siteforge_core::error::{ProviderError, ReconcileError};
use siteforge_core::observed::{DeployStatus, DistributionHandle, ObservedDnsRecord};
use siteforge_core::report::{ResourceKind, ResourceOutcome};
use siteforge_provisioner::reconcile;

use support::{Fakes, fast_config, site_spec};

#[tokio::test]
async fn first_run_creates_everything_in_order() {
    let fakes = Fakes::empty();
    let report = reconcile(&fakes.providers(), &site_spec(), &fast_config())
        .await
        .unwrap();

    assert!(report.converged());
    let outcomes: Vec<(ResourceKind, ResourceOutcome)> = report
        .resources
        .iter()
        .map(|r| (r.kind, r.outcome))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (ResourceKind::Bucket, ResourceOutcome::Created),
            (ResourceKind::Distribution, ResourceOutcome::Created),
            (ResourceKind::DnsRecord, ResourceOutcome::Created),
        ]
    );

    assert_eq!(
        fakes.mutating_calls(),
        vec![
            "bucket.create",
            "bucket.allow_public_policy",
            "bucket.put_website",
            "bucket.put_policy",
            "bucket.put_read_cors",
            "distribution.create",
            "dns.upsert www.example.com",
        ]
    );
}

#[tokio::test]
async fn converged_stack_touches_nothing() {
    let fakes = Fakes::converged();
    let report = reconcile(&fakes.providers(), &site_spec(), &fast_config())
        .await
        .unwrap();

    assert!(report.converged());
    assert!(report.resources.iter().all(|r| r.outcome == ResourceOutcome::NoOp));
    assert!(fakes.mutating_calls().is_empty());
}

#[tokio::test]
async fn dns_records_point_at_the_fresh_distribution() {
    let fakes = Fakes::converged();
    // The distribution is gone but its old record lingers.
    *fakes.distribution.state.lock().unwrap() = None;
    fakes.dns.records.lock().unwrap().insert(
        "www.example.com".to_string(),
        ObservedDnsRecord {
            domain_name: "www.example.com".to_string(),
            alias_target: "doldold.cloudfront.net".to_string(),
        },
    );

    let report = reconcile(&fakes.providers(), &site_spec(), &fast_config())
        .await
        .unwrap();
    assert!(report.converged());

    // The record target is bound after the distribution stage, not from
    // the stale observation.
    let records = fakes.dns.records.lock().unwrap();
    assert_eq!(
        records["www.example.com"].alias_target,
        "dfake123.cloudfront.net"
    );
}

#[tokio::test]
async fn bucket_failure_blocks_everything_downstream() {
    let fakes = Fakes::empty();
    *fakes.bucket.policy_failure.lock().unwrap() =
        Some(ProviderError::Auth("explicit deny".to_string()));

    let report = reconcile(&fakes.providers(), &site_spec(), &fast_config())
        .await
        .unwrap();

    assert!(!report.converged());
    let bucket = report.of_kind(ResourceKind::Bucket).next().unwrap();
    assert_eq!(bucket.outcome, ResourceOutcome::Failed);
    assert!(bucket.detail.as_deref().unwrap().contains("explicit deny"));

    let dist = report.of_kind(ResourceKind::Distribution).next().unwrap();
    assert_eq!(dist.outcome, ResourceOutcome::Blocked);
    let dns = report.of_kind(ResourceKind::DnsRecord).next().unwrap();
    assert_eq!(dns.outcome, ResourceOutcome::Blocked);

    // Downstream drivers were never invoked.
    let calls = fakes.calls();
    assert!(!calls.iter().any(|c| c == "distribution.create"));
    assert!(!calls.iter().any(|c| c.starts_with("dns.upsert")));
}

#[tokio::test]
async fn transient_bucket_errors_are_retried() {
    let fakes = Fakes::empty();
    *fakes.bucket.create_failures.lock().unwrap() = vec![
        ProviderError::Throttled("slow down".to_string()),
        ProviderError::Unavailable("503".to_string()),
    ];

    let report = reconcile(&fakes.providers(), &site_spec(), &fast_config())
        .await
        .unwrap();

    assert!(report.converged());
    let creates = fakes.calls().iter().filter(|c| *c == "bucket.create").count();
    assert_eq!(creates, 3);
}

#[tokio::test]
async fn auth_errors_are_not_retried() {
    let fakes = Fakes::empty();
    *fakes.bucket.create_failures.lock().unwrap() =
        vec![ProviderError::Auth("denied".to_string())];

    let report = reconcile(&fakes.providers(), &site_spec(), &fast_config())
        .await
        .unwrap();

    assert!(!report.converged());
    let creates = fakes.calls().iter().filter(|c| *c == "bucket.create").count();
    assert_eq!(creates, 1);
}

#[tokio::test]
async fn conflict_triggers_exactly_one_replan_then_succeeds() {
    let fakes = Fakes::converged();
    let mut spec = site_spec();
    spec.distribution.default_ttl = 60;
    *fakes.distribution.update_failures.lock().unwrap() = vec![ProviderError::Conflict {
        token: "ETAG1".to_string(),
    }];

    let report = reconcile(&fakes.providers(), &spec, &fast_config())
        .await
        .unwrap();

    assert!(report.converged());
    let dist = report.of_kind(ResourceKind::Distribution).next().unwrap();
    assert_eq!(dist.outcome, ResourceOutcome::Updated);

    let calls = fakes.calls();
    let updates = calls.iter().filter(|c| *c == "distribution.update").count();
    let lists = calls.iter().filter(|c| *c == "distribution.list").count();
    assert_eq!(updates, 2);
    // One initial observation, one refresh after the conflict.
    assert_eq!(lists, 2);
}

#[tokio::test]
async fn second_conflict_is_terminal() {
    let fakes = Fakes::converged();
    let mut spec = site_spec();
    spec.distribution.default_ttl = 60;
    *fakes.distribution.update_failures.lock().unwrap() = vec![
        ProviderError::Conflict {
            token: "ETAG1".to_string(),
        },
        ProviderError::Conflict {
            token: "ETAG1x".to_string(),
        },
    ];

    let report = reconcile(&fakes.providers(), &spec, &fast_config())
        .await
        .unwrap();

    assert!(!report.converged());
    let dist = report.of_kind(ResourceKind::Distribution).next().unwrap();
    assert_eq!(dist.outcome, ResourceOutcome::Failed);
    let dns = report.of_kind(ResourceKind::DnsRecord).next().unwrap();
    assert_eq!(dns.outcome, ResourceOutcome::Blocked);

    let updates = fakes
        .calls()
        .iter()
        .filter(|c| *c == "distribution.update")
        .count();
    assert_eq!(updates, 2);
}

#[tokio::test]
async fn pending_distribution_blocks_its_own_update() {
    let fakes = Fakes::converged();
    fakes
        .distribution
        .state
        .lock()
        .unwrap()
        .as_mut()
        .unwrap()
        .status = DeployStatus::Pending;
    let mut spec = site_spec();
    spec.distribution.default_ttl = 60;

    let report = reconcile(&fakes.providers(), &spec, &fast_config())
        .await
        .unwrap();

    assert!(!report.converged());
    let dist = report.of_kind(ResourceKind::Distribution).next().unwrap();
    assert_eq!(dist.outcome, ResourceOutcome::Blocked);
    assert!(fakes.mutating_calls().is_empty());
}

#[tokio::test]
async fn ambiguous_distributions_halt_the_run() {
    let fakes = Fakes::empty();
    let origin = site_spec().bucket.website_endpoint();
    *fakes.distribution.extra_handles.lock().unwrap() = vec![
        DistributionHandle {
            id: "EONE".to_string(),
            origin_domain: origin.clone(),
        },
        DistributionHandle {
            id: "ETWO".to_string(),
            origin_domain: origin,
        },
    ];

    let err = reconcile(&fakes.providers(), &site_spec(), &fast_config())
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::AmbiguousDistribution { .. }));
    assert!(fakes.mutating_calls().is_empty());
}

#[tokio::test]
async fn invalid_spec_never_reaches_a_provider() {
    let fakes = Fakes::empty();
    let mut spec = site_spec();
    spec.distribution.alias_domains.clear();

    let err = reconcile(&fakes.providers(), &spec, &fast_config())
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Validation(_)));
    assert!(fakes.calls().is_empty());
}

#[tokio::test]
async fn dns_failures_are_contained_per_domain() {
    let fakes = Fakes::empty();
    let mut spec = site_spec();
    spec.distribution.alias_domains.push("example.com".to_string());
    fakes.dns.fail_domains.lock().unwrap().insert(
        "example.com".to_string(),
        ProviderError::Other("zone is read-only".to_string()),
    );

    let report = reconcile(&fakes.providers(), &spec, &fast_config())
        .await
        .unwrap();

    assert!(!report.converged());
    let by_domain: Vec<(&str, ResourceOutcome)> = report
        .of_kind(ResourceKind::DnsRecord)
        .map(|r| (r.identifier.as_deref().unwrap(), r.outcome))
        .collect();
    assert_eq!(
        by_domain,
        vec![
            ("example.com", ResourceOutcome::Failed),
            ("www.example.com", ResourceOutcome::Created),
        ]
    );

    // The rest of the stack still converged.
    let dist = report.of_kind(ResourceKind::Distribution).next().unwrap();
    assert_eq!(dist.outcome, ResourceOutcome::Created);
}

#[tokio::test]
async fn dns_management_off_plans_no_records() {
    let fakes = Fakes::empty();
    let mut spec = site_spec();
    spec.create_dns_records = false;

    let report = reconcile(&fakes.providers(), &spec, &fast_config())
        .await
        .unwrap();

    assert!(report.converged());
    assert_eq!(report.of_kind(ResourceKind::DnsRecord).count(), 0);
    assert!(!fakes.calls().iter().any(|c| c.starts_with("dns.")));
}
