use std::sync::Arc;

use siteforge_core::error::{ProviderError, ReconcileError};
use siteforge_core::observed::ObservedDnsRecord;
use siteforge_core::planner::DnsOp;
use siteforge_core::report::ResourceKind;

use crate::provider::DnsProvider;

pub struct DnsDriver {
    provider: Arc<dyn DnsProvider>,
}

impl DnsDriver {
    pub fn new(provider: Arc<dyn DnsProvider>) -> Self {
        Self { provider }
    }

    /// Apply one planned change for one domain. `target` is the
    /// distribution's assigned domain, resolved by the orchestrator after
    /// the distribution stage completes. Create and Update are the same
    /// provider call — the record write is an upsert.
    pub async fn apply(
        &self,
        op: &DnsOp,
        domain: &str,
        target: &str,
    ) -> Result<Option<ObservedDnsRecord>, ReconcileError> {
        match op {
            DnsOp::NoOp => Ok(None),
            DnsOp::Create | DnsOp::Update => {
                self.provider
                    .upsert_alias(domain, target)
                    .await
                    .map_err(|source| driver_err("upsert", source))?;
                tracing::info!(domain, target, "alias record upserted");
                Ok(Some(ObservedDnsRecord {
                    domain_name: domain.to_string(),
                    alias_target: target.to_string(),
                }))
            }
        }
    }
}

fn driver_err(op: &'static str, source: ProviderError) -> ReconcileError {
    ReconcileError::Driver {
        kind: ResourceKind::DnsRecord,
        op,
        source,
    }
}
