use std::collections::BTreeMap;

use siteforge_core::error::{ProviderError, ReconcileError};
use siteforge_core::observed::{ObservedDistribution, ObservedStack};
use siteforge_core::report::ResourceKind;
use siteforge_core::validate::NormalizedSpec;

use crate::provider::{DistributionProvider, Providers};

/// Read the live state of every resource in the site. Absence is an
/// expected state (`None`), never an error; anything else the provider
/// reports is an observation failure for that resource.
pub async fn observe_stack(
    providers: &Providers,
    spec: &NormalizedSpec,
) -> Result<ObservedStack, ReconcileError> {
    let bucket = match providers.bucket.describe(&spec.bucket.name).await {
        Ok(bucket) => Some(bucket),
        Err(ProviderError::NotFound) => None,
        Err(source) => {
            return Err(ReconcileError::Observation {
                kind: ResourceKind::Bucket,
                source,
            });
        }
    };

    let distribution =
        find_distribution(providers.distribution.as_ref(), &spec.bucket.website_endpoint()).await?;

    let mut dns_records = BTreeMap::new();
    for record in &spec.dns_records {
        let observed = match providers.dns.find_alias(&record.domain_name).await {
            Ok(observed) => Some(observed),
            Err(ProviderError::NotFound) => None,
            Err(source) => {
                return Err(ReconcileError::Observation {
                    kind: ResourceKind::DnsRecord,
                    source,
                });
            }
        };
        dns_records.insert(record.domain_name.clone(), observed);
    }

    Ok(ObservedStack {
        bucket,
        distribution,
        dns_records,
    })
}

/// Distributions are not indexed by origin, so locate ours by scanning the
/// listing for a matching origin domain. More than one match is ambiguous
/// and halts reconciliation — acting on either could clobber the wrong one.
async fn find_distribution(
    provider: &dyn DistributionProvider,
    origin_domain: &str,
) -> Result<Option<ObservedDistribution>, ReconcileError> {
    let handles = provider.list().await.map_err(|source| {
        ReconcileError::Observation {
            kind: ResourceKind::Distribution,
            source,
        }
    })?;

    let mut matches: Vec<String> = handles
        .into_iter()
        .filter(|h| h.origin_domain.eq_ignore_ascii_case(origin_domain))
        .map(|h| h.id)
        .collect();

    match matches.len() {
        0 => Ok(None),
        1 => {
            let id = matches.remove(0);
            let observed = provider.get(&id).await.map_err(|source| {
                ReconcileError::Observation {
                    kind: ResourceKind::Distribution,
                    source,
                }
            })?;
            Ok(Some(observed))
        }
        _ => Err(ReconcileError::AmbiguousDistribution {
            origin: origin_domain.to_string(),
            matches,
        }),
    }
}
