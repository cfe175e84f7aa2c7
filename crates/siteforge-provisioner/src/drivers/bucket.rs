use std::sync::Arc;

use serde_json::json;
use siteforge_core::error::{ProviderError, ReconcileError};
use siteforge_core::observed::ObservedBucket;
use siteforge_core::planner::BucketOp;
use siteforge_core::report::ResourceKind;
use siteforge_core::spec::BucketSpec;

use crate::provider::BucketProvider;

pub struct BucketDriver {
    provider: Arc<dyn BucketProvider>,
    spec: BucketSpec,
}

impl BucketDriver {
    pub fn new(provider: Arc<dyn BucketProvider>, spec: BucketSpec) -> Self {
        Self { provider, spec }
    }

    /// Apply one planned change. `Ok(None)` for a no-op; otherwise the
    /// state the bucket was driven to. Safe to call repeatedly — create is
    /// idempotent and the configuration puts are full replaces.
    pub async fn apply(&self, op: &BucketOp) -> Result<Option<ObservedBucket>, ReconcileError> {
        match op {
            BucketOp::NoOp => return Ok(None),
            BucketOp::Create => {
                self.provider
                    .create(&self.spec.name, &self.spec.region)
                    .await
                    .map_err(|source| driver_err("create", source))?;
                self.configure().await?;
                tracing::info!(bucket = %self.spec.name, "website bucket created");
            }
            BucketOp::Replace => {
                self.configure().await?;
                tracing::info!(bucket = %self.spec.name, "website bucket configuration replaced");
            }
        }

        Ok(Some(ObservedBucket {
            region: self.spec.region.clone(),
            root_object: Some(self.spec.root_object.clone()),
            error_object: self.spec.error_object.clone(),
            public_read: true,
            cors_read: true,
        }))
    }

    /// Website hosting, public-read policy and CORS have no partial-update
    /// semantics; each put replaces the whole setting.
    async fn configure(&self) -> Result<(), ReconcileError> {
        self.provider
            .allow_public_policy(&self.spec.name)
            .await
            .map_err(|source| driver_err("allow public policy", source))?;

        self.provider
            .put_website(
                &self.spec.name,
                &self.spec.root_object,
                self.spec.error_object.as_deref(),
            )
            .await
            .map_err(|source| driver_err("put website configuration", source))?;

        let policy = public_read_policy(&self.spec.name);
        self.provider
            .put_policy(&self.spec.name, &policy.to_string())
            .await
            .map_err(|source| driver_err("put bucket policy", source))?;

        self.provider
            .put_read_cors(&self.spec.name)
            .await
            .map_err(|source| driver_err("put cors", source))?;

        Ok(())
    }
}

/// Public read access scoped to the website content path.
pub fn public_read_policy(bucket: &str) -> serde_json::Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "PublicReadGetObject",
            "Effect": "Allow",
            "Principal": "*",
            "Action": "s3:GetObject",
            "Resource": format!("arn:aws:s3:::{bucket}/*"),
        }]
    })
}

fn driver_err(op: &'static str, source: ProviderError) -> ReconcileError {
    ReconcileError::Driver {
        kind: ResourceKind::Bucket,
        op,
        source,
    }
}
