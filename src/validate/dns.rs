//! Pre-provision DNS zone conflict validation
//!
//! Runs later in the pipeline than the configuration checks, once a live
//! DNS client is available. Resolves the hosted zone the cluster's
//! records will land in, checks the zone actually covers the cluster
//! domain, and scans the zone's existing record sets for names that would
//! collide with the cluster's.

use tracing::{debug, warn};

use crate::config::{InstallConfig, Platform, PublishingStrategy};
use crate::diagnostics::{Diagnostic, Diagnostics, FieldPath};
use crate::inventory::{DnsSource, HostedZone, Inventory};

/// Validate the target hosted zone against the cluster's future domain.
///
/// Applies only when endpoints are published externally; fully internal
/// clusters create no public records.
pub(crate) async fn validate_zone_conflicts(
    config: &InstallConfig,
    platform: &Platform,
    dns: &dyn DnsSource,
    inventory: &Inventory,
    diags: &mut Diagnostics,
) {
    if config.publish == PublishingStrategy::Internal {
        debug!("internal publishing strategy, skipping hosted zone checks");
        return;
    }

    let (zone, zone_path) = match platform.hosted_zone.as_deref() {
        Some(zone_id) => {
            let path = FieldPath::new("platform").child("aws").child("hostedZone");
            let zone = match dns.hosted_zone(zone_id).await {
                Ok(zone) => zone,
                // The lookup failure stands on its own; without a zone
                // there is nothing to check association or records against.
                Err(err) => {
                    warn!(zone = %zone_id, error = %err, "hosted zone lookup failed");
                    diags.push(Diagnostic::invalid(
                        path,
                        zone_id,
                        format!("cannot find hosted zone: {err}"),
                    ));
                    return;
                }
            };

            // A pre-existing zone must already be attached to the VPC the
            // cluster machines will live in.
            match inventory.vpc_id().await {
                Ok(vpc_id) => {
                    if vpc_id.is_empty() || !zone.vpcs.contains(&vpc_id) {
                        diags.push(Diagnostic::invalid(
                            path.clone(),
                            zone_id,
                            "hosted zone is not associated with the VPC",
                        ));
                    }
                }
                Err(err) => {
                    diags.push(Diagnostic::invalid(
                        path.clone(),
                        zone_id,
                        format!("no VPC found: {err}"),
                    ));
                }
            }

            (zone, path)
        }
        None => {
            let path = FieldPath::new("baseDomain");
            match dns.public_zone(&config.base_domain).await {
                Ok(zone) => (zone, path),
                Err(err) => {
                    warn!(domain = %config.base_domain, error = %err, "public zone lookup failed");
                    diags.push(Diagnostic::invalid(
                        path,
                        &config.base_domain,
                        "cannot find base domain",
                    ));
                    return;
                }
            }
        }
    };

    scan_zone_records(config, &zone, &zone_path, dns, diags).await;
}

/// Scan all record sets of the zone for collisions with the cluster domain
async fn scan_zone_records(
    config: &InstallConfig,
    zone: &HostedZone,
    zone_path: &FieldPath,
    dns: &dyn DnsSource,
    diags: &mut Diagnostics,
) {
    let dotted_cluster_domain = format!("{}.", config.cluster_domain());

    if !is_zone_parent_of(&zone.name, &dotted_cluster_domain) {
        diags.push(Diagnostic::invalid(
            zone_path.clone(),
            &zone.name,
            format!(
                "hosted zone domain {:?} is not a parent of the cluster domain {:?}",
                zone.name, dotted_cluster_domain
            ),
        ));
        return;
    }

    let mut problematic: Vec<String> = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = match dns
            .record_sets_page(&zone.id, page_token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(err) => {
                warn!(zone = %zone.id, error = %err, "record set listing failed");
                diags.push(Diagnostic::internal(
                    zone_path.clone(),
                    format!("could not list record sets for domain {:?}: {err}", zone.name),
                ));
                return;
            }
        };
        for record in &page.records {
            // Records outside the cluster domain belong to other tenants
            // of the zone; records exactly at the cluster domain are the
            // zone's own NS/SOA when the zone is the cluster domain.
            if record.name.ends_with(&dotted_cluster_domain)
                && record.name.len() > dotted_cluster_domain.len()
            {
                problematic.push(format!("{} ({})", record.name, record.record_type));
            }
        }
        page_token = page.next_token;
        if page_token.is_none() {
            break;
        }
    }

    if !problematic.is_empty() {
        diags.push(Diagnostic::invalid(
            zone_path.clone(),
            &zone.name,
            format!(
                "the zone already has record sets for the domain of the cluster: [{}]",
                problematic.join(", ")
            ),
        ));
    }
}

/// True when the zone name equals the dotted domain or is a dotted-suffix
/// ancestor of it
fn is_zone_parent_of(zone_name: &str, dotted_domain: &str) -> bool {
    zone_name == dotted_domain || dotted_domain.ends_with(&format!(".{zone_name}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::config::{Networking, PlatformConfig};
    use crate::error::LookupError;
    use crate::inventory::{MockInventorySource, RecordSet, RecordSetPage};

    /// Fixture DNS source; page tokens are the page index rendered as a
    /// string. Hand-rolled rather than mocked because the paging methods
    /// take optional borrowed tokens.
    struct FakeDns {
        zone: Result<HostedZone, LookupError>,
        pages: Result<Vec<RecordSetPage>, LookupError>,
    }

    impl FakeDns {
        fn with_zone(zone: HostedZone, records: Vec<Vec<RecordSet>>) -> Self {
            let last = records.len().saturating_sub(1);
            let pages = records
                .into_iter()
                .enumerate()
                .map(|(idx, records)| RecordSetPage {
                    records,
                    next_token: (idx < last).then(|| (idx + 1).to_string()),
                })
                .collect();
            Self {
                zone: Ok(zone),
                pages: Ok(pages),
            }
        }

        fn zone_failure(err: LookupError) -> Self {
            Self {
                zone: Err(err),
                pages: Ok(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DnsSource for FakeDns {
        async fn hosted_zone(&self, _id: &str) -> Result<HostedZone, LookupError> {
            self.zone.clone()
        }

        async fn public_zone(&self, _domain: &str) -> Result<HostedZone, LookupError> {
            self.zone.clone()
        }

        async fn record_sets_page(
            &self,
            _zone_id: &str,
            page_token: Option<&str>,
        ) -> Result<RecordSetPage, LookupError> {
            let pages = self.pages.clone()?;
            let idx: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
            Ok(pages.get(idx).cloned().unwrap_or_default())
        }
    }

    /// DNS source that must never be consulted
    struct UnusedDns;

    #[async_trait]
    impl DnsSource for UnusedDns {
        async fn hosted_zone(&self, _id: &str) -> Result<HostedZone, LookupError> {
            unreachable!("DNS source must not be used")
        }

        async fn public_zone(&self, _domain: &str) -> Result<HostedZone, LookupError> {
            unreachable!("DNS source must not be used")
        }

        async fn record_sets_page(
            &self,
            _zone_id: &str,
            _page_token: Option<&str>,
        ) -> Result<RecordSetPage, LookupError> {
            unreachable!("DNS source must not be used")
        }
    }

    fn config(publish: PublishingStrategy, hosted_zone: Option<&str>) -> InstallConfig {
        InstallConfig {
            name: "cluster".to_string(),
            base_domain: "example.com".to_string(),
            networking: Networking::default(),
            publish,
            platform: PlatformConfig {
                aws: Some(Platform {
                    region: "us-east-1".to_string(),
                    subnets: Vec::new(),
                    service_endpoints: Vec::new(),
                    hosted_zone: hosted_zone.map(|s| s.to_string()),
                    ami_id: None,
                    default_machine_platform: None,
                }),
            },
            control_plane: None,
            compute: Vec::new(),
        }
    }

    fn zone(id: &str, name: &str, vpcs: &[&str]) -> HostedZone {
        HostedZone {
            id: id.to_string(),
            name: name.to_string(),
            vpcs: vpcs.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn record(name: &str, record_type: &str) -> RecordSet {
        RecordSet {
            name: name.to_string(),
            record_type: record_type.to_string(),
        }
    }

    async fn run_validator(
        config: &InstallConfig,
        dns: &dyn DnsSource,
        source: MockInventorySource,
    ) -> Diagnostics {
        let inventory = Inventory::new(Arc::new(source));
        let platform = config.platform.aws.as_ref().unwrap();
        let mut diags = Diagnostics::new();
        validate_zone_conflicts(config, platform, dns, &inventory, &mut diags).await;
        diags
    }

    #[tokio::test]
    async fn internal_publishing_skips_everything() {
        let config = config(PublishingStrategy::Internal, Some("Z123"));
        let diags = run_validator(&config, &UnusedDns, MockInventorySource::new()).await;
        assert!(diags.is_empty());
    }

    /// Story: Only records below the cluster domain are collisions
    ///
    /// A zone `example.com.` holding `api.cluster.example.com.` (A) and
    /// `example.com.` (NS) against cluster domain `cluster.example.com`
    /// flags only the first record.
    #[tokio::test]
    async fn story_only_strict_subdomain_records_are_problematic() {
        let config = config(PublishingStrategy::External, None);
        let dns = FakeDns::with_zone(
            zone("Z111", "example.com.", &[]),
            vec![vec![
                record("api.cluster.example.com.", "A"),
                record("example.com.", "NS"),
                record("cluster.example.com.", "SOA"),
                record("other.example.com.", "A"),
            ]],
        );

        let diags = run_validator(&config, &dns, MockInventorySource::new()).await;

        assert_eq!(diags.len(), 1);
        let diagnostic = diags.iter().next().unwrap();
        assert_eq!(diagnostic.path.as_str(), "baseDomain");
        assert!(diagnostic
            .detail
            .contains("record sets for the domain of the cluster: [api.cluster.example.com. (A)]"));
    }

    #[tokio::test]
    async fn record_scan_pages_through_the_whole_zone() {
        let config = config(PublishingStrategy::External, None);
        let dns = FakeDns::with_zone(
            zone("Z111", "example.com.", &[]),
            vec![
                vec![record("a.cluster.example.com.", "A")],
                vec![record("b.cluster.example.com.", "TXT")],
            ],
        );

        let diags = run_validator(&config, &dns, MockInventorySource::new()).await;

        assert_eq!(diags.len(), 1);
        let detail = &diags.iter().next().unwrap().detail;
        assert!(detail.contains("a.cluster.example.com. (A)"));
        assert!(detail.contains("b.cluster.example.com. (TXT)"));
    }

    /// Story: A zone lookup failure is reported on its own
    ///
    /// The failure to fetch the zone is not conflated with the VPC
    /// association check, which never runs without a zone.
    #[tokio::test]
    async fn story_zone_lookup_failure_is_distinct_from_association() {
        let config = config(PublishingStrategy::External, Some("Z404"));
        let dns = FakeDns::zone_failure(LookupError::new("hosted zone", "not found"));

        // No inventory expectations: the VPC check must not run.
        let diags = run_validator(&config, &dns, MockInventorySource::new()).await;

        assert_eq!(diags.len(), 1);
        let diagnostic = diags.iter().next().unwrap();
        assert_eq!(diagnostic.path.as_str(), "platform.aws.hostedZone");
        assert!(diagnostic.detail.starts_with("cannot find hosted zone: "));
        assert!(!diagnostic.detail.contains("associated with the VPC"));
    }

    #[tokio::test]
    async fn zone_must_be_associated_with_the_cluster_vpc() {
        let config = config(PublishingStrategy::External, Some("Z123"));
        let dns = FakeDns::with_zone(zone("Z123", "example.com.", &["vpc-other"]), vec![vec![]]);
        let mut source = MockInventorySource::new();
        source
            .expect_vpc_id()
            .returning(|| Ok("vpc-cluster".to_string()));

        let diags = run_validator(&config, &dns, source).await;

        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.iter().next().unwrap().detail,
            "hosted zone is not associated with the VPC"
        );
    }

    #[tokio::test]
    async fn associated_zone_with_clean_records_passes() {
        let config = config(PublishingStrategy::External, Some("Z123"));
        let dns = FakeDns::with_zone(
            zone("Z123", "example.com.", &["vpc-cluster"]),
            vec![vec![record("example.com.", "SOA")]],
        );
        let mut source = MockInventorySource::new();
        source
            .expect_vpc_id()
            .returning(|| Ok("vpc-cluster".to_string()));

        let diags = run_validator(&config, &dns, source).await;
        assert!(diags.is_empty(), "unexpected: {:?}", diags);
    }

    #[tokio::test]
    async fn vpc_lookup_failure_is_wrapped_with_context() {
        let config = config(PublishingStrategy::External, Some("Z123"));
        let dns = FakeDns::with_zone(zone("Z123", "example.com.", &["vpc-cluster"]), vec![vec![]]);
        let mut source = MockInventorySource::new();
        source
            .expect_vpc_id()
            .returning(|| Err(LookupError::new("vpc", "access denied")));

        let diags = run_validator(&config, &dns, source).await;

        assert_eq!(diags.len(), 1);
        let diagnostic = diags.iter().next().unwrap();
        assert!(diagnostic.detail.starts_with("no VPC found: "));
        assert!(diagnostic.detail.contains("vpc lookup failed"));
    }

    #[tokio::test]
    async fn zone_that_is_not_a_domain_ancestor_is_rejected() {
        let config = config(PublishingStrategy::External, None);
        let dns = FakeDns::with_zone(zone("Z999", "elsewhere.net.", &[]), vec![vec![]]);

        let diags = run_validator(&config, &dns, MockInventorySource::new()).await;

        assert_eq!(diags.len(), 1);
        assert!(diags
            .iter()
            .next()
            .unwrap()
            .detail
            .contains("is not a parent of the cluster domain"));
    }

    #[tokio::test]
    async fn missing_base_domain_zone_is_reported() {
        let config = config(PublishingStrategy::External, None);
        let dns = FakeDns::zone_failure(LookupError::new("public zone", "no matching zone"));

        let diags = run_validator(&config, &dns, MockInventorySource::new()).await;

        assert_eq!(diags.len(), 1);
        let diagnostic = diags.iter().next().unwrap();
        assert_eq!(diagnostic.path.as_str(), "baseDomain");
        assert_eq!(diagnostic.detail, "cannot find base domain");
    }

    #[tokio::test]
    async fn record_listing_failure_is_an_internal_diagnostic() {
        let config = config(PublishingStrategy::External, None);
        let dns = FakeDns {
            zone: Ok(zone("Z111", "example.com.", &[])),
            pages: Err(LookupError::new("record sets", "throttled")),
        };

        let diags = run_validator(&config, &dns, MockInventorySource::new()).await;

        assert_eq!(diags.len(), 1);
        let diagnostic = diags.iter().next().unwrap();
        assert!(diagnostic.detail.starts_with("internal error: "));
        assert!(diagnostic
            .detail
            .contains("could not list record sets for domain \"example.com.\""));
    }

    #[test]
    fn zone_parent_matching_requires_a_label_boundary() {
        assert!(is_zone_parent_of("example.com.", "cluster.example.com."));
        assert!(is_zone_parent_of(
            "cluster.example.com.",
            "cluster.example.com."
        ));
        // Suffix without a dot boundary is a different domain.
        assert!(!is_zone_parent_of("ample.com.", "cluster.example.com."));
    }
}
