use aws_sdk_cloudfront::Client;
use aws_sdk_cloudfront::types::{
    Aliases, CookiePreference, CustomOriginConfig, DefaultCacheBehavior, Distribution,
    DistributionConfig as CfDistributionConfig, EventType, ForwardedValues, ItemSelection,
    LambdaFunctionAssociation, LambdaFunctionAssociations, MinimumProtocolVersion, Origin,
    OriginProtocolPolicy, Origins, PriceClass as CfPriceClass, SslSupportMethod,
    ViewerCertificate, ViewerProtocolPolicy,
};
use siteforge_core::error::ProviderError;
use siteforge_core::observed::{DeployStatus, DistributionHandle, ObservedDistribution};
use siteforge_core::spec::{EdgeEventType, EdgeFunctionBinding};

use crate::aws::{build_err, classify};
use crate::provider::{BoxFuture, DistributionConfig, DistributionProvider};

/// Stable id for the single origin every distribution we manage carries.
const ORIGIN_ID: &str = "siteforge-website-origin";

pub struct CloudFrontApi {
    client: Client,
}

impl CloudFrontApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl DistributionProvider for CloudFrontApi {
    fn list(&self) -> BoxFuture<'_, Result<Vec<DistributionHandle>, ProviderError>> {
        Box::pin(async move {
            let mut handles = Vec::new();
            let mut marker: Option<String> = None;
            loop {
                let mut request = self.client.list_distributions();
                if let Some(m) = &marker {
                    request = request.marker(m);
                }
                let resp = request.send().await.map_err(classify)?;
                let Some(list) = resp.distribution_list() else {
                    break;
                };
                for summary in list.items() {
                    let origin_domain = summary
                        .origins()
                        .and_then(|o| o.items().first())
                        .map(|o| o.domain_name().to_string())
                        .unwrap_or_default();
                    handles.push(DistributionHandle {
                        id: summary.id().to_string(),
                        origin_domain,
                    });
                }
                if !list.is_truncated() {
                    break;
                }
                marker = list.next_marker().map(str::to_string);
                if marker.is_none() {
                    break;
                }
            }
            Ok(handles)
        })
    }

    fn get(&self, id: &str) -> BoxFuture<'_, Result<ObservedDistribution, ProviderError>> {
        let id = id.to_string();
        Box::pin(async move {
            let resp = self
                .client
                .get_distribution()
                .id(&id)
                .send()
                .await
                .map_err(classify)?;
            let dist = resp
                .distribution()
                .ok_or_else(|| ProviderError::Other("distribution missing from response".into()))?;
            Ok(observed_from(dist, resp.e_tag().unwrap_or_default()))
        })
    }

    fn create(
        &self,
        config: &DistributionConfig,
    ) -> BoxFuture<'_, Result<ObservedDistribution, ProviderError>> {
        let config = config.clone();
        Box::pin(async move {
            let rendered = render_config(&config)?;
            let resp = self
                .client
                .create_distribution()
                .distribution_config(rendered)
                .send()
                .await
                .map_err(classify)?;
            let dist = resp
                .distribution()
                .ok_or_else(|| ProviderError::Other("distribution missing from response".into()))?;
            tracing::info!(
                id = %dist.id(),
                domain = %dist.domain_name(),
                origin = %config.origin_domain,
                "distribution submitted"
            );
            Ok(observed_from(dist, resp.e_tag().unwrap_or_default()))
        })
    }

    fn update(
        &self,
        id: &str,
        config: &DistributionConfig,
        version_token: &str,
    ) -> BoxFuture<'_, Result<ObservedDistribution, ProviderError>> {
        let id = id.to_string();
        let config = config.clone();
        let version_token = version_token.to_string();
        Box::pin(async move {
            // Updates must resubmit the full configuration; fetch the
            // current one and merge in only the fields we control.
            let fetched = self
                .client
                .get_distribution_config()
                .id(&id)
                .send()
                .await
                .map_err(classify)?;
            let current = fetched
                .distribution_config()
                .cloned()
                .ok_or_else(|| ProviderError::Other("distribution config missing".into()))?;
            let merged = merge_config(current, &config)?;

            let resp = self
                .client
                .update_distribution()
                .id(&id)
                .if_match(&version_token)
                .distribution_config(merged)
                .send()
                .await
                .map_err(|err| match classify(err) {
                    ProviderError::Conflict { .. } => ProviderError::Conflict {
                        token: version_token.clone(),
                    },
                    other => other,
                })?;
            let dist = resp
                .distribution()
                .ok_or_else(|| ProviderError::Other("distribution missing from response".into()))?;
            tracing::info!(id = %dist.id(), "distribution update submitted");
            Ok(observed_from(dist, resp.e_tag().unwrap_or_default()))
        })
    }
}

fn observed_from(dist: &Distribution, etag: &str) -> ObservedDistribution {
    let cfg = dist
        .distribution_config()
        .expect("distribution config missing from response");
    let behavior = cfg
        .default_cache_behavior()
        .expect("default cache behavior missing from distribution config");
    let origin_domain = cfg
        .origins()
        .and_then(|o| o.items().first())
        .map(|o| o.domain_name().to_string())
        .unwrap_or_default();
    let edge_functions = behavior
        .lambda_function_associations()
        .map(|l| l.items())
        .unwrap_or_default()
        .iter()
        .filter_map(|assoc| {
            let event_type = EdgeEventType::parse(assoc.event_type().as_str())?;
            let function_arn = assoc.lambda_function_arn().to_string();
            Some(EdgeFunctionBinding {
                function_arn,
                event_type,
            })
        })
        .collect();

    ObservedDistribution {
        id: dist.id().to_string(),
        domain_name: dist.domain_name().to_string(),
        status: DeployStatus::from_provider(dist.status()),
        version_token: etag.to_string(),
        origin_domain,
        alias_domains: cfg
            .aliases()
            .map(|a| a.items().to_vec())
            .unwrap_or_default(),
        certificate_arn: cfg
            .viewer_certificate()
            .and_then(|v| v.acm_certificate_arn())
            .map(str::to_string),
        default_ttl: behavior.default_ttl().unwrap_or(0).max(0) as u64,
        max_ttl: behavior.max_ttl().unwrap_or(0).max(0) as u64,
        price_class: cfg
            .price_class()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "PriceClass_All".to_string()),
        tls_policy: cfg
            .viewer_certificate()
            .and_then(|v| v.minimum_protocol_version())
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
        root_object: cfg.default_root_object().unwrap_or_default().to_string(),
        edge_functions,
    }
}

/// Full configuration for a create, rendered from scratch.
fn render_config(desired: &DistributionConfig) -> Result<CfDistributionConfig, ProviderError> {
    CfDistributionConfig::builder()
        .caller_reference(&desired.caller_reference)
        .comment(&desired.comment)
        .enabled(true)
        .origins(render_origins(desired)?)
        .default_cache_behavior(render_cache_behavior(desired)?)
        .aliases(render_aliases(desired)?)
        .default_root_object(&desired.root_object)
        .price_class(CfPriceClass::from(desired.price_class.as_str()))
        .viewer_certificate(render_viewer_certificate(desired))
        .build()
        .map_err(build_err)
}

/// Overlay the fields we control onto the live configuration. Everything
/// else — logging, WAF, geo restrictions, extra cache behaviors, the
/// caller reference — keeps its current value.
fn merge_config(
    mut current: CfDistributionConfig,
    desired: &DistributionConfig,
) -> Result<CfDistributionConfig, ProviderError> {
    current.origins = Some(render_origins(desired)?);
    current.default_cache_behavior = Some(render_cache_behavior(desired)?);
    current.aliases = Some(render_aliases(desired)?);
    current.default_root_object = Some(desired.root_object.clone());
    current.price_class = Some(CfPriceClass::from(desired.price_class.as_str()));
    current.viewer_certificate = Some(render_viewer_certificate(desired));
    current.comment = desired.comment.clone();
    Ok(current)
}

fn render_origins(desired: &DistributionConfig) -> Result<Origins, ProviderError> {
    // S3 website endpoints are plain HTTP custom origins; the REST origin
    // form would bypass the index/error document handling.
    let origin = Origin::builder()
        .id(ORIGIN_ID)
        .domain_name(&desired.origin_domain)
        .custom_origin_config(
            CustomOriginConfig::builder()
                .http_port(80)
                .https_port(443)
                .origin_protocol_policy(OriginProtocolPolicy::HttpOnly)
                .build()
                .map_err(build_err)?,
        )
        .build()
        .map_err(build_err)?;
    Origins::builder()
        .quantity(1)
        .items(origin)
        .build()
        .map_err(build_err)
}

fn render_cache_behavior(
    desired: &DistributionConfig,
) -> Result<DefaultCacheBehavior, ProviderError> {
    let mut builder = DefaultCacheBehavior::builder()
        .target_origin_id(ORIGIN_ID)
        .viewer_protocol_policy(ViewerProtocolPolicy::RedirectToHttps)
        .forwarded_values(
            ForwardedValues::builder()
                .query_string(false)
                .cookies(
                    CookiePreference::builder()
                        .forward(ItemSelection::None)
                        .build()
                        .map_err(build_err)?,
                )
                .build()
                .map_err(build_err)?,
        )
        .min_ttl(0)
        .default_ttl(desired.default_ttl as i64)
        .max_ttl(desired.max_ttl as i64);

    if !desired.edge_functions.is_empty() {
        let mut associations =
            LambdaFunctionAssociations::builder().quantity(desired.edge_functions.len() as i32);
        for binding in &desired.edge_functions {
            associations = associations.items(
                LambdaFunctionAssociation::builder()
                    .lambda_function_arn(&binding.function_arn)
                    .event_type(EventType::from(binding.event_type.as_str()))
                    .build()
                    .map_err(build_err)?,
            );
        }
        builder = builder.lambda_function_associations(
            associations.build().map_err(build_err)?,
        );
    }

    builder.build().map_err(build_err)
}

fn render_aliases(desired: &DistributionConfig) -> Result<Aliases, ProviderError> {
    let mut builder = Aliases::builder().quantity(desired.alias_domains.len() as i32);
    for domain in &desired.alias_domains {
        builder = builder.items(domain);
    }
    builder.build().map_err(build_err)
}

fn render_viewer_certificate(desired: &DistributionConfig) -> ViewerCertificate {
    ViewerCertificate::builder()
        .acm_certificate_arn(&desired.certificate_arn)
        .ssl_support_method(SslSupportMethod::SniOnly)
        .minimum_protocol_version(MinimumProtocolVersion::from(desired.tls_policy.as_str()))
        .build()
}
