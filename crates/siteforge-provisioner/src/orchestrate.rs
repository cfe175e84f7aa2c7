use std::collections::BTreeMap;
use std::sync::Arc;

use siteforge_core::error::ReconcileError;
use siteforge_core::observed::ObservedStack;
use siteforge_core::planner::{BucketOp, DistributionOp, DnsOp, PlannedDns, ReconcilePlan, plan};
use siteforge_core::report::{ReconcileReport, ResourceKind, ResourceOutcome, ResourceReport};
use siteforge_core::spec::SiteSpec;
use siteforge_core::validate::{NormalizedSpec, validate};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::EngineConfig;
use crate::drivers::{BucketDriver, DistributionDriver, DnsDriver};
use crate::observe::observe_stack;
use crate::provider::Providers;
use crate::retry::with_retry;

/// One full reconciliation run: validate, observe, plan, execute.
///
/// Stages run strictly in dependency order — bucket, then distribution,
/// then DNS — and the run completes once changes are submitted, not once
/// they are live. Holds no state between runs; a cancelled or failed run
/// is safe to re-run, since the next run re-observes and treats applied
/// changes as already satisfied.
pub async fn reconcile(
    providers: &Providers,
    spec: &SiteSpec,
    config: &EngineConfig,
) -> Result<ReconcileReport, ReconcileError> {
    let normalized = validate(spec)?;

    let observed = with_retry(&config.retry, "observe", || {
        observe_stack(providers, &normalized)
    })
    .await?;

    let plan = plan(&normalized, &observed)?;
    tracing::info!(
        bucket_op = ?plan.bucket.op,
        distribution_op = ?plan.distribution.op,
        dns_ops = plan.dns.len(),
        changes = plan.has_changes(),
        "plan computed"
    );

    execute_plan(providers, &normalized, &observed, &plan, config).await
}

async fn execute_plan(
    providers: &Providers,
    normalized: &NormalizedSpec,
    observed: &ObservedStack,
    plan: &ReconcilePlan,
    config: &EngineConfig,
) -> Result<ReconcileReport, ReconcileError> {
    let mut report = ReconcileReport::default();

    // ── bucket stage ──
    let bucket_driver = BucketDriver::new(providers.bucket.clone(), normalized.bucket.clone());
    let bucket_outcome = match &plan.bucket.op {
        BucketOp::NoOp => ResourceOutcome::NoOp,
        op => {
            let applied =
                with_retry(&config.retry, "bucket apply", || bucket_driver.apply(op)).await;
            match applied {
                Ok(_) => match op {
                    BucketOp::Create => ResourceOutcome::Created,
                    _ => ResourceOutcome::Updated,
                },
                Err(err) => {
                    tracing::error!(error = %err, "bucket stage failed; blocking downstream");
                    report.push(ResourceReport {
                        kind: ResourceKind::Bucket,
                        outcome: ResourceOutcome::Failed,
                        identifier: Some(normalized.bucket.name.clone()),
                        detail: Some(err.to_string()),
                    });
                    report.push(blocked(
                        ResourceKind::Distribution,
                        None,
                        "bucket did not converge",
                    ));
                    block_dns(&mut report, &plan.dns, "bucket did not converge");
                    return Ok(report);
                }
            }
        }
    };
    report.push(ResourceReport {
        kind: ResourceKind::Bucket,
        outcome: bucket_outcome,
        identifier: Some(normalized.bucket.name.clone()),
        detail: None,
    });

    // ── distribution stage ──
    if plan.distribution.blocked && plan.distribution.op != DistributionOp::NoOp {
        let domain = observed.distribution.as_ref().map(|d| d.domain_name.clone());
        report.push(blocked(
            ResourceKind::Distribution,
            domain,
            "distribution is still deploying and cannot be safely changed",
        ));
        block_dns(&mut report, &plan.dns, "distribution change is blocked");
        return Ok(report);
    }

    let stage = converge_distribution(providers, normalized, observed, plan, config).await?;
    report.push(ResourceReport {
        kind: ResourceKind::Distribution,
        outcome: stage.outcome,
        identifier: stage.domain.clone(),
        detail: stage.detail,
    });
    if !stage.outcome.applied() {
        block_dns(&mut report, &plan.dns, "distribution did not converge");
        return Ok(report);
    }

    // ── dns stage ──
    // The target value is the deferred slot between stages: the
    // distribution's assigned domain, known only now.
    let Some(target) = stage.domain else {
        block_dns(&mut report, &plan.dns, "distribution domain is unknown");
        return Ok(report);
    };
    for row in fan_out_dns(providers, &plan.dns, &target, config).await {
        report.push(row);
    }

    Ok(report)
}

struct DistributionStage {
    outcome: ResourceOutcome,
    /// Assigned distribution domain, when known.
    domain: Option<String>,
    detail: Option<String>,
}

/// Drive the distribution toward the plan, with at most one
/// re-observe-and-replan cycle when the version token conflicts.
async fn converge_distribution(
    providers: &Providers,
    normalized: &NormalizedSpec,
    observed: &ObservedStack,
    run_plan: &ReconcilePlan,
    config: &EngineConfig,
) -> Result<DistributionStage, ReconcileError> {
    let driver = DistributionDriver::new(providers.distribution.clone(), normalized);
    let op = &run_plan.distribution.op;

    if *op == DistributionOp::NoOp {
        return Ok(DistributionStage {
            outcome: ResourceOutcome::NoOp,
            domain: observed.distribution.as_ref().map(|d| d.domain_name.clone()),
            detail: None,
        });
    }

    let first = with_retry(&config.retry, "distribution apply", || driver.apply(op)).await;
    match first {
        Ok(applied) => Ok(DistributionStage {
            outcome: outcome_for(op),
            domain: applied.map(|d| d.domain_name),
            detail: None,
        }),
        Err(ReconcileError::Conflict { .. }) => {
            tracing::warn!("distribution changed concurrently; re-observing and replanning once");
            let reobserved = with_retry(&config.retry, "re-observe", || {
                observe_stack(providers, normalized)
            })
            .await?;
            let replanned = plan(normalized, &reobserved)?;

            if replanned.distribution.blocked
                && replanned.distribution.op != DistributionOp::NoOp
            {
                return Ok(DistributionStage {
                    outcome: ResourceOutcome::Blocked,
                    domain: reobserved.distribution.as_ref().map(|d| d.domain_name.clone()),
                    detail: Some(
                        "distribution is still deploying and cannot be safely changed".into(),
                    ),
                });
            }

            match &replanned.distribution.op {
                DistributionOp::NoOp => Ok(DistributionStage {
                    outcome: ResourceOutcome::NoOp,
                    domain: reobserved.distribution.as_ref().map(|d| d.domain_name.clone()),
                    detail: None,
                }),
                op2 => {
                    let second =
                        with_retry(&config.retry, "distribution apply", || driver.apply(op2))
                            .await;
                    match second {
                        Ok(applied) => Ok(DistributionStage {
                            outcome: outcome_for(op2),
                            domain: applied.map(|d| d.domain_name),
                            detail: None,
                        }),
                        // A second conflict (or anything else) is terminal:
                        // exactly one refresh cycle.
                        Err(err) => Ok(DistributionStage {
                            outcome: ResourceOutcome::Failed,
                            domain: None,
                            detail: Some(err.to_string()),
                        }),
                    }
                }
            }
        }
        Err(err) => Ok(DistributionStage {
            outcome: ResourceOutcome::Failed,
            domain: None,
            detail: Some(err.to_string()),
        }),
    }
}

fn outcome_for(op: &DistributionOp) -> ResourceOutcome {
    match op {
        DistributionOp::Create => ResourceOutcome::Created,
        DistributionOp::Update { .. } => ResourceOutcome::Updated,
        DistributionOp::NoOp => ResourceOutcome::NoOp,
    }
}

/// Per-domain upserts are independent; run them on a bounded worker pool
/// and collect results keyed by domain — completion order is arbitrary.
async fn fan_out_dns(
    providers: &Providers,
    planned: &[PlannedDns],
    target: &str,
    config: &EngineConfig,
) -> Vec<ResourceReport> {
    let semaphore = Arc::new(Semaphore::new(config.dns_concurrency.max(1)));
    let mut workers = JoinSet::new();

    for entry in planned {
        let entry = entry.clone();
        let target = target.to_string();
        let provider = providers.dns.clone();
        let retry = config.retry.clone();
        let semaphore = semaphore.clone();

        workers.spawn(async move {
            // The semaphore is never closed, so acquisition cannot fail.
            let _permit = semaphore.acquire_owned().await.ok();
            let driver = DnsDriver::new(provider);

            let (outcome, detail) = match &entry.op {
                DnsOp::NoOp => (ResourceOutcome::NoOp, None),
                op => {
                    let applied = with_retry(&retry, "dns upsert", || {
                        driver.apply(op, &entry.domain_name, &target)
                    })
                    .await;
                    match applied {
                        Ok(_) => match op {
                            DnsOp::Create => (ResourceOutcome::Created, None),
                            _ => (ResourceOutcome::Updated, None),
                        },
                        Err(err) => (ResourceOutcome::Failed, Some(err.to_string())),
                    }
                }
            };
            (entry.domain_name, outcome, detail)
        });
    }

    let mut outcomes: BTreeMap<String, (ResourceOutcome, Option<String>)> = BTreeMap::new();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((domain, outcome, detail)) => {
                outcomes.insert(domain, (outcome, detail));
            }
            Err(err) => {
                tracing::error!(error = %err, "dns worker failed to run");
            }
        }
    }

    outcomes
        .into_iter()
        .map(|(domain, (outcome, detail))| ResourceReport {
            kind: ResourceKind::DnsRecord,
            outcome,
            identifier: Some(domain),
            detail,
        })
        .collect()
}

fn blocked(kind: ResourceKind, identifier: Option<String>, why: &str) -> ResourceReport {
    ResourceReport {
        kind,
        outcome: ResourceOutcome::Blocked,
        identifier,
        detail: Some(why.to_string()),
    }
}

fn block_dns(report: &mut ReconcileReport, planned: &[PlannedDns], why: &str) {
    for entry in planned {
        report.push(blocked(
            ResourceKind::DnsRecord,
            Some(entry.domain_name.clone()),
            why,
        ));
    }
}
