use std::sync::Arc;

use siteforge_core::error::{ProviderError, ReconcileError};
use siteforge_core::observed::ObservedDistribution;
use siteforge_core::planner::DistributionOp;
use siteforge_core::report::ResourceKind;
use siteforge_core::validate::NormalizedSpec;

use crate::provider::{DistributionConfig, DistributionProvider};

pub struct DistributionDriver {
    provider: Arc<dyn DistributionProvider>,
    config: DistributionConfig,
}

impl DistributionDriver {
    pub fn new(provider: Arc<dyn DistributionProvider>, spec: &NormalizedSpec) -> Self {
        Self {
            provider,
            config: DistributionConfig::from_spec(spec),
        }
    }

    /// Apply one planned change. Returns immediately with the provider's
    /// reported state — status Pending after any create or update; the
    /// driver never waits for Deployed.
    ///
    /// A version-token mismatch on update surfaces as a conflict; whether
    /// to re-observe and replan is the orchestrator's decision.
    pub async fn apply(
        &self,
        op: &DistributionOp,
    ) -> Result<Option<ObservedDistribution>, ReconcileError> {
        match op {
            DistributionOp::NoOp => Ok(None),
            DistributionOp::Create => {
                let observed = self
                    .provider
                    .create(&self.config)
                    .await
                    .map_err(|source| driver_err("create", source))?;
                tracing::info!(
                    id = %observed.id,
                    domain = %observed.domain_name,
                    "distribution created, deploying"
                );
                Ok(Some(observed))
            }
            DistributionOp::Update { id, version_token } => {
                let observed = self
                    .provider
                    .update(id, &self.config, version_token)
                    .await
                    .map_err(|source| match source {
                        conflict @ ProviderError::Conflict { .. } => ReconcileError::Conflict {
                            kind: ResourceKind::Distribution,
                            source: conflict,
                        },
                        source => driver_err("update", source),
                    })?;
                tracing::info!(
                    id = %observed.id,
                    domain = %observed.domain_name,
                    "distribution updated, deploying"
                );
                Ok(Some(observed))
            }
        }
    }
}

fn driver_err(op: &'static str, source: ProviderError) -> ReconcileError {
    ReconcileError::Driver {
        kind: ResourceKind::Distribution,
        op,
        source,
    }
}
