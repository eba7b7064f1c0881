//! Service-endpoint resolution
//!
//! Default endpoints are derived from the published partition tables;
//! declared overrides always win. Resolution is strict: a region that no
//! partition enumerates resolves nothing without an explicit override,
//! so typos surface here instead of as connection timeouts deep inside
//! provisioning.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::ServiceEndpoint;

/// Services every install requires a resolvable endpoint for
pub const REQUIRED_SERVICES: [&str; 7] = [
    "ec2",
    "elasticloadbalancing",
    "iam",
    "route53",
    "s3",
    "sts",
    "tagging",
];

/// The compute service, whose endpoint doubles as the region existence probe
pub const COMPUTE_SERVICE: &str = "ec2";

/// Id of the standard partition
pub const STANDARD_PARTITION: &str = "aws";

/// A partition of the cloud: an isolated group of regions sharing a DNS
/// suffix for service endpoints
#[derive(Debug, PartialEq, Eq)]
pub struct Partition {
    /// Partition identifier
    pub id: &'static str,
    /// DNS suffix of the partition's default endpoints
    pub dns_suffix: &'static str,
    /// Regions the partition publishes
    pub regions: &'static [&'static str],
}

impl Partition {
    /// True when the partition publishes the region
    pub fn is_enumerated(&self, region: &str) -> bool {
        self.regions.contains(&region)
    }

    /// The partition's default endpoint URL for a service in a region
    pub fn default_endpoint(&self, service: &str, region: &str) -> String {
        format!("https://{service}.{region}.{}", self.dns_suffix)
    }
}

/// The published partitions
pub const PARTITIONS: [Partition; 3] = [
    Partition {
        id: "aws",
        dns_suffix: "amazonaws.com",
        regions: &[
            "af-south-1",
            "ap-east-1",
            "ap-northeast-1",
            "ap-northeast-2",
            "ap-northeast-3",
            "ap-south-1",
            "ap-south-2",
            "ap-southeast-1",
            "ap-southeast-2",
            "ap-southeast-3",
            "ap-southeast-4",
            "ca-central-1",
            "ca-west-1",
            "eu-central-1",
            "eu-central-2",
            "eu-north-1",
            "eu-south-1",
            "eu-south-2",
            "eu-west-1",
            "eu-west-2",
            "eu-west-3",
            "il-central-1",
            "me-central-1",
            "me-south-1",
            "sa-east-1",
            "us-east-1",
            "us-east-2",
            "us-west-1",
            "us-west-2",
        ],
    },
    Partition {
        id: "aws-cn",
        dns_suffix: "amazonaws.com.cn",
        regions: &["cn-north-1", "cn-northwest-1"],
    },
    Partition {
        id: "aws-us-gov",
        dns_suffix: "amazonaws.com",
        regions: &["us-gov-east-1", "us-gov-west-1"],
    },
];

/// Geographic prefixes the standard partition claims
const STANDARD_GEO_PREFIXES: [&str; 8] = ["us", "eu", "ap", "sa", "ca", "me", "af", "il"];

/// Find the partition a region belongs to.
///
/// Matching follows each partition's region pattern, so regions not yet
/// enumerated in the tables (e.g. a newly launched `eu-*` region) still
/// map to their partition. Returns `None` for names no partition claims.
pub fn partition_for_region(region: &str) -> Option<&'static Partition> {
    let id = if region.starts_with("us-gov-") && has_region_shape(region) {
        "aws-us-gov"
    } else if region.starts_with("cn-") && has_region_shape(region) {
        "aws-cn"
    } else if has_region_shape(region)
        && STANDARD_GEO_PREFIXES
            .iter()
            .any(|prefix| region.split('-').next() == Some(*prefix))
    {
        "aws"
    } else {
        return None;
    };
    PARTITIONS.iter().find(|p| p.id == id)
}

/// True for names shaped like `geo-location-N`
fn has_region_shape(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    parts.len() >= 3
        && parts.iter().all(|p| !p.is_empty())
        && parts
            .last()
            .map(|n| n.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
}

/// No endpoint could be resolved for a service in a region
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no endpoint found for service {service:?} in region {region:?}")]
pub struct ResolveError {
    /// The service that failed to resolve
    pub service: String,
    /// The region resolution was attempted for
    pub region: String,
}

/// Strict endpoint resolver for one region plus declared overrides
pub struct EndpointResolver<'a> {
    region: &'a str,
    overrides: BTreeMap<&'a str, &'a str>,
}

impl<'a> EndpointResolver<'a> {
    /// Build a resolver from the region and the declared overrides.
    ///
    /// When a service is declared more than once, the first declaration
    /// wins.
    pub fn new(region: &'a str, overrides: &'a [ServiceEndpoint]) -> Self {
        let mut map = BTreeMap::new();
        for endpoint in overrides {
            map.entry(endpoint.name.as_str())
                .or_insert(endpoint.url.as_str());
        }
        Self {
            region,
            overrides: map,
        }
    }

    /// Resolve a service endpoint under strict matching.
    ///
    /// An override wins outright. Otherwise the region must be enumerated
    /// by its partition for the default endpoint to be trusted.
    pub fn resolve(&self, service: &str) -> Result<String, ResolveError> {
        if let Some(url) = self.overrides.get(service) {
            return Ok((*url).to_string());
        }
        if let Some(partition) = partition_for_region(self.region) {
            if partition.is_enumerated(self.region) {
                return Ok(partition.default_endpoint(service, self.region));
            }
        }
        Err(ResolveError {
            service: service.to_string(),
            region: self.region.to_string(),
        })
    }

    /// True when an override was declared for the service
    pub fn has_override(&self, service: &str) -> bool {
        self.overrides.contains_key(service)
    }
}
