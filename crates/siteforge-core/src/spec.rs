use serde::{Deserialize, Serialize};

/// Desired state for the website bucket.
///
/// The bucket name doubles as the resource identifier; S3 bucket names are
/// globally unique. The region is fixed at creation — a region change is a
/// hard conflict, never an in-place update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    pub region: String,
    /// Object served at the site root, e.g. "index.html".
    #[serde(default = "default_root_object")]
    pub root_object: String,
    /// Object served for 4xx responses, if any.
    #[serde(default)]
    pub error_object: Option<String>,
}

/// Regions that predate 2014 serve the website endpoint with a dash
/// before the region; every later region serves only the dot form.
const DASH_ENDPOINT_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "sa-east-1",
];

impl BucketSpec {
    /// The S3 static-website endpoint for this bucket. This is the origin
    /// domain the distribution fronts.
    pub fn website_endpoint(&self) -> String {
        if DASH_ENDPOINT_REGIONS.contains(&self.region.as_str()) {
            format!("{}.s3-website-{}.amazonaws.com", self.name, self.region)
        } else {
            format!("{}.s3-website.{}.amazonaws.com", self.name, self.region)
        }
    }
}

pub(crate) fn default_root_object() -> String {
    "index.html".to_string()
}

/// CloudFront price class: which edge locations serve the distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceClass {
    /// All edge locations.
    All,
    /// North America, Europe, Asia, Middle East, Africa ("PriceClass_200").
    UsEuropeAsia,
    /// North America and Europe only ("PriceClass_100").
    UsEurope,
}

impl PriceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceClass::All => "PriceClass_All",
            PriceClass::UsEuropeAsia => "PriceClass_200",
            PriceClass::UsEurope => "PriceClass_100",
        }
    }
}

/// Minimum TLS protocol version the distribution accepts from viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsPolicy {
    TlsV1,
    TlsV1_2016,
    TlsV11_2016,
    TlsV12_2018,
    TlsV12_2019,
    TlsV12_2021,
}

impl TlsPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            TlsPolicy::TlsV1 => "TLSv1",
            TlsPolicy::TlsV1_2016 => "TLSv1_2016",
            TlsPolicy::TlsV11_2016 => "TLSv1.1_2016",
            TlsPolicy::TlsV12_2018 => "TLSv1.2_2018",
            TlsPolicy::TlsV12_2019 => "TLSv1.2_2019",
            TlsPolicy::TlsV12_2021 => "TLSv1.2_2021",
        }
    }
}

/// Distribution lifecycle event an edge function is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeEventType {
    ViewerRequest,
    ViewerResponse,
    OriginRequest,
    OriginResponse,
}

impl EdgeEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeEventType::ViewerRequest => "viewer-request",
            EdgeEventType::ViewerResponse => "viewer-response",
            EdgeEventType::OriginRequest => "origin-request",
            EdgeEventType::OriginResponse => "origin-response",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "viewer-request" => Some(EdgeEventType::ViewerRequest),
            "viewer-response" => Some(EdgeEventType::ViewerResponse),
            "origin-request" => Some(EdgeEventType::OriginRequest),
            "origin-response" => Some(EdgeEventType::OriginResponse),
            _ => None,
        }
    }
}

/// A Lambda@Edge function bound to one distribution lifecycle event.
/// At most one binding per event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFunctionBinding {
    pub function_arn: String,
    pub event_type: EdgeEventType,
}

/// Desired state for the content-delivery distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionSpec {
    /// Name of the website bucket this distribution fronts. Must match
    /// the bucket spec in the same site.
    pub origin_bucket: String,
    /// Custom domain names, in declaration order. Non-empty, no duplicates.
    pub alias_domains: Vec<String>,
    /// ACM certificate covering every alias domain. Coverage is validated
    /// by the provider, not locally; only the ARN syntax is checked here.
    pub certificate_arn: String,
    pub default_ttl: u64,
    pub max_ttl: u64,
    pub price_class: PriceClass,
    pub tls_policy: TlsPolicy,
    #[serde(default = "default_root_object")]
    pub root_object: String,
    #[serde(default)]
    pub edge_functions: Vec<EdgeFunctionBinding>,
}

/// Desired state for one DNS alias record. Derived per alias domain during
/// normalization; skipped entirely (not created, not diffed) unless
/// `create_record` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecordSpec {
    pub domain_name: String,
    pub create_record: bool,
}

/// User-declared desired state for the whole site: bucket, distribution,
/// and whether to manage DNS alias records for the distribution's domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSpec {
    pub bucket: BucketSpec,
    pub distribution: DistributionSpec,
    #[serde(default)]
    pub create_dns_records: bool,
}

#[cfg(test)]
mod tests {
    use super::BucketSpec;

    fn bucket(region: &str) -> BucketSpec {
        BucketSpec {
            name: "example-site".to_string(),
            region: region.to_string(),
            root_object: "index.html".to_string(),
            error_object: None,
        }
    }

    #[test]
    fn legacy_regions_use_the_dash_endpoint() {
        assert_eq!(
            bucket("eu-west-1").website_endpoint(),
            "example-site.s3-website-eu-west-1.amazonaws.com"
        );
        assert_eq!(
            bucket("us-east-1").website_endpoint(),
            "example-site.s3-website-us-east-1.amazonaws.com"
        );
    }

    #[test]
    fn newer_regions_use_the_dot_endpoint() {
        assert_eq!(
            bucket("us-east-2").website_endpoint(),
            "example-site.s3-website.us-east-2.amazonaws.com"
        );
        assert_eq!(
            bucket("eu-central-1").website_endpoint(),
            "example-site.s3-website.eu-central-1.amazonaws.com"
        );
    }
}
