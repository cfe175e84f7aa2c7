//! AWS SDK adapters for the provider boundaries: S3 for the website
//! bucket, CloudFront for the distribution, Route 53 for DNS. Every SDK
//! failure is folded into the engine's `ProviderError` classes here; the
//! engine never sees raw SDK errors.

pub mod bucket;
pub mod distribution;
pub mod dns;

use std::sync::Arc;

use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use siteforge_core::error::{ProviderError, format_err_chain};

use crate::provider::Providers;

pub use bucket::S3BucketApi;
pub use distribution::CloudFrontApi;
pub use dns::Route53Api;

impl Providers {
    /// Wire up all three AWS adapters from the ambient credential chain.
    pub async fn from_env() -> Providers {
        providers_from_env().await
    }
}

/// Wire up all three adapters from the ambient credential chain.
///
/// The CloudFront and Route 53 control planes are global and addressed
/// through us-east-1 regardless of where the bucket lives.
pub async fn providers_from_env() -> Providers {
    let base = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    let global = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new("us-east-1"))
        .load()
        .await;

    Providers {
        bucket: Arc::new(S3BucketApi::new(aws_sdk_s3::Client::new(&base))),
        distribution: Arc::new(CloudFrontApi::new(aws_sdk_cloudfront::Client::new(&global))),
        dns: Arc::new(Route53Api::new(aws_sdk_route53::Client::new(&global))),
    }
}

/// Fold an SDK error into the engine's provider error classes, keyed by
/// the service error code. Unrecognized codes carry the full error chain.
pub(crate) fn classify<E, R>(err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    if matches!(err, SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)) {
        return ProviderError::Unavailable(format_err_chain(&err));
    }

    let code = err.code().unwrap_or("").to_string();
    let message = format_err_chain(&err);
    match code.as_str() {
        "NoSuchBucket" | "NoSuchDistribution" | "NoSuchHostedZone" | "NotFound" => {
            ProviderError::NotFound
        }
        "PreconditionFailed" | "InvalidIfMatchVersion" => ProviderError::Conflict {
            token: String::new(),
        },
        "Throttling" | "ThrottlingException" | "SlowDown" | "TooManyRequests"
        | "RequestLimitExceeded" | "PriorRequestNotComplete" => ProviderError::Throttled(message),
        "InternalError" | "InternalFailure" | "ServiceUnavailable" => {
            ProviderError::Unavailable(message)
        }
        "AccessDenied" | "AccessDeniedException" | "UnauthorizedOperation"
        | "InvalidClientTokenId" | "InvalidAccessKeyId" | "ExpiredToken"
        | "SignatureDoesNotMatch" => ProviderError::Auth(message),
        _ => ProviderError::Other(message),
    }
}

/// A request that cannot even be constructed is a bug in our rendering,
/// not a provider fault; surface it with context.
pub(crate) fn build_err<E: std::error::Error>(err: E) -> ProviderError {
    ProviderError::Other(format!("invalid request: {err}"))
}
