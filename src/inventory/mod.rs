//! Live infrastructure inventory
//!
//! Everything validation knows about the target account flows through the
//! traits here: an [`InventorySource`] for network and instance facts, a
//! [`DnsSource`] for hosted zones and record sets, and a
//! [`SessionProvider`] for region-scoped clients. The traits abstract the
//! cloud SDK for testability; implementations are supplied by
//! collaborators and are expected to be idempotent and side-effect free.
//!
//! Validators never call a source directly; lookups go through the
//! per-run [`Inventory`] cache so each remote call happens at most once
//! per validation run.

mod cache;

pub use cache::Inventory;

use std::collections::BTreeMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::LookupError;

/// A subnet as observed in the target account.
///
/// Public/private classification is derived live from route-table
/// egress and carried by which lookup returned the subnet, never by
/// declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subnet {
    /// Subnet identifier, globally unique within the reconciled set
    pub id: String,
    /// Availability zone the subnet lives in
    pub zone: String,
    /// The subnet's CIDR range as reported by the cloud
    pub cidr: String,
}

/// An instance type from the region's catalog
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceType {
    /// Type name, e.g. "m5.xlarge"
    pub name: String,
    /// Default vCPU count
    pub vcpus: i64,
    /// Memory in MiB
    pub memory_mib: i64,
}

/// A hosted DNS zone
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostedZone {
    /// Zone identifier
    pub id: String,
    /// Zone name, dotted with a trailing period (e.g. "example.com.")
    pub name: String,
    /// Ids of the VPCs the zone is associated with
    pub vpcs: Vec<String>,
}

/// One DNS record set within a hosted zone
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSet {
    /// Record name, dotted with a trailing period
    pub name: String,
    /// Record type (e.g. "A", "NS", "SOA")
    pub record_type: String,
}

/// One page of a zone's record sets
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordSetPage {
    /// Records on this page
    pub records: Vec<RecordSet>,
    /// Token for the next page, absent on the last page
    pub next_token: Option<String>,
}

/// An authenticated client scoped to one region
#[derive(Clone, Debug)]
pub struct Session {
    /// The region the session is scoped to
    pub region: String,
    /// The region's default compute-service endpoint URL
    pub compute_endpoint: String,
}

/// Source of network and instance facts for the target region/account.
///
/// The subnet lookups return only subnets among the ids the run declared,
/// keyed by id; classification happens in the source from live route
/// tables.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Declared subnets classified private (egress via NAT)
    async fn private_subnets(&self) -> Result<BTreeMap<String, Subnet>, LookupError>;

    /// Declared subnets classified public (egress via internet gateway)
    async fn public_subnets(&self) -> Result<BTreeMap<String, Subnet>, LookupError>;

    /// All availability zones of the region
    async fn availability_zones(&self) -> Result<Vec<String>, LookupError>;

    /// The region's instance-type catalog, keyed by type name
    async fn instance_types(&self) -> Result<BTreeMap<String, InstanceType>, LookupError>;

    /// Id of the VPC containing the declared subnets
    async fn vpc_id(&self) -> Result<String, LookupError>;
}

/// Source of hosted zones and their record sets
#[async_trait]
pub trait DnsSource: Send + Sync {
    /// Fetch a hosted zone by id
    async fn hosted_zone(&self, id: &str) -> Result<HostedZone, LookupError>;

    /// Find the most specific public zone matching the domain
    async fn public_zone(&self, domain: &str) -> Result<HostedZone, LookupError>;

    /// Fetch one page of a zone's record sets
    async fn record_sets_page(
        &self,
        zone_id: &str,
        page_token: Option<&str>,
    ) -> Result<RecordSetPage, LookupError>;
}

/// Supplier of region-scoped sessions.
///
/// Errors surface as validator-local diagnostics, never panics.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Open a session, optionally scoped to a region other than the default
    async fn session(&self, region_override: Option<&str>) -> crate::Result<Session>;
}
