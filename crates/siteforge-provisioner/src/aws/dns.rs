use aws_sdk_route53::Client;
use aws_sdk_route53::types::{
    AliasTarget, Change, ChangeAction, ChangeBatch, ResourceRecordSet, RrType,
};
use siteforge_core::error::ProviderError;
use siteforge_core::observed::ObservedDnsRecord;

use crate::aws::{build_err, classify};
use crate::provider::{BoxFuture, DnsProvider};

/// The fixed hosted zone id all CloudFront alias targets belong to.
const CLOUDFRONT_ALIAS_ZONE: &str = "Z2FDTNDATAQYW2";

pub struct Route53Api {
    client: Client,
}

impl Route53Api {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The hosted zone whose name is the longest suffix of `domain`, as
    /// (zone id, zone name). `domain` must already be normalized.
    async fn zone_for(&self, domain: &str) -> Result<Option<(String, String)>, ProviderError> {
        let mut best: Option<(String, String)> = None;
        let mut marker: Option<String> = None;
        loop {
            let mut request = self.client.list_hosted_zones();
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let resp = request.send().await.map_err(classify)?;
            for zone in resp.hosted_zones() {
                let name = zone.name().trim_end_matches('.').to_ascii_lowercase();
                let covers = domain == name || domain.ends_with(&format!(".{name}"));
                let closer = best.as_ref().map(|(_, b)| name.len() > b.len()).unwrap_or(true);
                if covers && closer {
                    let id = zone.id().trim_start_matches("/hostedzone/").to_string();
                    best = Some((id, name));
                }
            }
            if !resp.is_truncated() {
                break;
            }
            marker = resp.next_marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        Ok(best)
    }
}

impl DnsProvider for Route53Api {
    fn find_alias(&self, domain: &str) -> BoxFuture<'_, Result<ObservedDnsRecord, ProviderError>> {
        let domain = normalize(domain);
        Box::pin(async move {
            let Some((zone_id, _)) = self.zone_for(&domain).await? else {
                return Err(ProviderError::NotFound);
            };

            let resp = self
                .client
                .list_resource_record_sets()
                .hosted_zone_id(&zone_id)
                .start_record_name(&domain)
                .start_record_type(RrType::A)
                .max_items(1)
                .send()
                .await
                .map_err(classify)?;

            for record in resp.resource_record_sets() {
                if normalize(record.name()) != domain || *record.r#type() != RrType::A {
                    continue;
                }
                if let Some(alias) = record.alias_target() {
                    return Ok(ObservedDnsRecord {
                        domain_name: domain.clone(),
                        alias_target: alias.dns_name().trim_end_matches('.').to_string(),
                    });
                }
            }
            Err(ProviderError::NotFound)
        })
    }

    fn upsert_alias(
        &self,
        domain: &str,
        target: &str,
    ) -> BoxFuture<'_, Result<(), ProviderError>> {
        let domain = normalize(domain);
        let target = target.to_string();
        Box::pin(async move {
            let Some((zone_id, zone_name)) = self.zone_for(&domain).await? else {
                return Err(ProviderError::Other(format!(
                    "no hosted zone covers {domain}"
                )));
            };

            let alias = AliasTarget::builder()
                .hosted_zone_id(CLOUDFRONT_ALIAS_ZONE)
                .dns_name(&target)
                .evaluate_target_health(false)
                .build()
                .map_err(build_err)?;
            let record = ResourceRecordSet::builder()
                .name(&domain)
                .r#type(RrType::A)
                .alias_target(alias)
                .build()
                .map_err(build_err)?;
            let change = Change::builder()
                .action(ChangeAction::Upsert)
                .resource_record_set(record)
                .build()
                .map_err(build_err)?;
            let batch = ChangeBatch::builder()
                .changes(change)
                .build()
                .map_err(build_err)?;

            self.client
                .change_resource_record_sets()
                .hosted_zone_id(&zone_id)
                .change_batch(batch)
                .send()
                .await
                .map_err(classify)?;
            tracing::info!(domain = %domain, zone = %zone_name, target = %target, "alias record upserted");
            Ok(())
        })
    }
}

/// Route 53 stores names fully qualified and case-insensitively.
fn normalize(domain: &str) -> String {
    domain.trim_end_matches('.').to_ascii_lowercase()
}
