use aws_sdk_s3::Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CorsConfiguration, CorsRule, CreateBucketConfiguration,
    ErrorDocument, IndexDocument, PublicAccessBlockConfiguration, WebsiteConfiguration,
};
use siteforge_core::error::ProviderError;
use siteforge_core::observed::ObservedBucket;

use crate::aws::{build_err, classify};
use crate::provider::{BoxFuture, BucketProvider};

/// Sid that marks the public-read statement as ours when describing.
const PUBLIC_READ_SID: &str = "PublicReadGetObject";

pub struct S3BucketApi {
    client: Client,
}

impl S3BucketApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl BucketProvider for S3BucketApi {
    fn describe(&self, name: &str) -> BoxFuture<'_, Result<ObservedBucket, ProviderError>> {
        let name = name.to_string();
        Box::pin(async move {
            // Existence probe first; a missing bucket is NotFound here, not
            // a missing-website-config on the later calls.
            let location = self
                .client
                .get_bucket_location()
                .bucket(&name)
                .send()
                .await
                .map_err(classify)?;
            // The classic API reports us-east-1 as an empty constraint.
            let region = location
                .location_constraint()
                .map(|c| c.as_str().to_string())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "us-east-1".to_string());

            let (root_object, error_object) =
                match self.client.get_bucket_website().bucket(&name).send().await {
                    Ok(resp) => (
                        resp.index_document().map(|d| d.suffix().to_string()),
                        resp.error_document().map(|d| d.key().to_string()),
                    ),
                    Err(err) if has_code(err.as_service_error(), "NoSuchWebsiteConfiguration") => {
                        (None, None)
                    }
                    Err(err) => return Err(classify(err)),
                };

            let public_read = match self.client.get_bucket_policy().bucket(&name).send().await {
                Ok(resp) => resp
                    .policy()
                    .map(|p| policy_grants_public_read(p))
                    .unwrap_or(false),
                Err(err) if has_code(err.as_service_error(), "NoSuchBucketPolicy") => false,
                Err(err) => return Err(classify(err)),
            };

            let cors_read = match self.client.get_bucket_cors().bucket(&name).send().await {
                Ok(resp) => resp.cors_rules().iter().any(|rule| {
                    rule.allowed_methods().iter().any(|m| m == "GET")
                        && rule.allowed_origins().iter().any(|o| o == "*")
                }),
                Err(err) if has_code(err.as_service_error(), "NoSuchCORSConfiguration") => false,
                Err(err) => return Err(classify(err)),
            };

            Ok(ObservedBucket {
                region,
                root_object,
                error_object,
                public_read,
                cors_read,
            })
        })
    }

    fn create(&self, name: &str, region: &str) -> BoxFuture<'_, Result<(), ProviderError>> {
        let name = name.to_string();
        let region = region.to_string();
        Box::pin(async move {
            let mut request = self.client.create_bucket().bucket(&name);
            // us-east-1 rejects an explicit location constraint.
            if region != "us-east-1" {
                request = request.create_bucket_configuration(
                    CreateBucketConfiguration::builder()
                        .location_constraint(BucketLocationConstraint::from(region.as_str()))
                        .build(),
                );
            }
            match request.send().await {
                Ok(_) => {
                    tracing::info!(bucket = %name, region = %region, "bucket created");
                    Ok(())
                }
                Err(err)
                    if err
                        .as_service_error()
                        .map(|e| e.is_bucket_already_owned_by_you())
                        .unwrap_or(false) =>
                {
                    // Re-running a create against our own bucket is converged.
                    Ok(())
                }
                Err(err) => Err(classify(err)),
            }
        })
    }

    fn allow_public_policy(&self, name: &str) -> BoxFuture<'_, Result<(), ProviderError>> {
        let name = name.to_string();
        Box::pin(async move {
            self.client
                .put_public_access_block()
                .bucket(&name)
                .public_access_block_configuration(
                    PublicAccessBlockConfiguration::builder()
                        .block_public_acls(false)
                        .ignore_public_acls(false)
                        .block_public_policy(false)
                        .restrict_public_buckets(false)
                        .build(),
                )
                .send()
                .await
                .map_err(classify)?;
            Ok(())
        })
    }

    fn put_website(
        &self,
        name: &str,
        root_object: &str,
        error_object: Option<&str>,
    ) -> BoxFuture<'_, Result<(), ProviderError>> {
        let name = name.to_string();
        let root_object = root_object.to_string();
        let error_object = error_object.map(str::to_string);
        Box::pin(async move {
            let mut website = WebsiteConfiguration::builder().index_document(
                IndexDocument::builder()
                    .suffix(&root_object)
                    .build()
                    .map_err(build_err)?,
            );
            if let Some(key) = &error_object {
                website = website.error_document(
                    ErrorDocument::builder().key(key).build().map_err(build_err)?,
                );
            }
            self.client
                .put_bucket_website()
                .bucket(&name)
                .website_configuration(website.build())
                .send()
                .await
                .map_err(classify)?;
            Ok(())
        })
    }

    fn put_policy(
        &self,
        name: &str,
        policy_json: &str,
    ) -> BoxFuture<'_, Result<(), ProviderError>> {
        let name = name.to_string();
        let policy_json = policy_json.to_string();
        Box::pin(async move {
            self.client
                .put_bucket_policy()
                .bucket(&name)
                .policy(&policy_json)
                .send()
                .await
                .map_err(classify)?;
            Ok(())
        })
    }

    fn put_read_cors(&self, name: &str) -> BoxFuture<'_, Result<(), ProviderError>> {
        let name = name.to_string();
        Box::pin(async move {
            let rule = CorsRule::builder()
                .allowed_methods("GET")
                .allowed_methods("HEAD")
                .allowed_origins("*")
                .allowed_headers("*")
                .max_age_seconds(3600)
                .build()
                .map_err(build_err)?;
            let cors = CorsConfiguration::builder()
                .cors_rules(rule)
                .build()
                .map_err(build_err)?;
            self.client
                .put_bucket_cors()
                .bucket(&name)
                .cors_configuration(cors)
                .send()
                .await
                .map_err(classify)?;
            Ok(())
        })
    }
}

fn has_code<E: ProvideErrorMetadata>(err: Option<&E>, code: &str) -> bool {
    err.and_then(|e| e.code()).map(|c| c == code).unwrap_or(false)
}

/// Whether a bucket policy document contains our public-read statement.
fn policy_grants_public_read(policy: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(policy)
        .ok()
        .and_then(|doc| {
            doc.get("Statement").and_then(|statements| {
                statements.as_array().map(|statements| {
                    statements
                        .iter()
                        .any(|s| s.get("Sid").and_then(|v| v.as_str()) == Some(PUBLIC_READ_SID))
                })
            })
        })
        .unwrap_or(false)
}
