//! Per-run memoization of inventory lookups
//!
//! Many validators share the same region/account facts. The cache keys on
//! lookup kind, since a run's lookup parameters (declared subnets, region)
//! are fixed, and guarantees each distinct lookup hits the remote source
//! at most once per run, failures included.
//! A failing lookup is deterministic for the rest of the run, not masked
//! as transient.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use super::{InstanceType, InventorySource, Subnet};
use crate::error::LookupError;

type Cached<T> = OnceCell<Result<Arc<T>, LookupError>>;

/// Read-through cache over an [`InventorySource`], valid for one run.
///
/// Each lookup kind is backed by a [`OnceCell`], which serializes
/// concurrent first callers on the same kind into a single underlying
/// remote call (single-flight) while lookups of distinct kinds proceed in
/// parallel. The cache is passed by reference into every validator; it is
/// never shared across runs and never persisted.
pub struct Inventory {
    source: Arc<dyn InventorySource>,
    private_subnets: Cached<BTreeMap<String, Subnet>>,
    public_subnets: Cached<BTreeMap<String, Subnet>>,
    availability_zones: Cached<Vec<String>>,
    instance_types: Cached<BTreeMap<String, InstanceType>>,
    vpc_id: Cached<String>,
}

impl Inventory {
    /// Create a fresh cache for one validation run
    pub fn new(source: Arc<dyn InventorySource>) -> Self {
        Self {
            source,
            private_subnets: OnceCell::new(),
            public_subnets: OnceCell::new(),
            availability_zones: OnceCell::new(),
            instance_types: OnceCell::new(),
            vpc_id: OnceCell::new(),
        }
    }

    /// Declared subnets classified private, keyed by id
    pub async fn private_subnets(
        &self,
    ) -> Result<Arc<BTreeMap<String, Subnet>>, LookupError> {
        self.private_subnets
            .get_or_init(|| async {
                debug!(lookup = "private_subnets", "fetching from inventory source");
                self.source.private_subnets().await.map(Arc::new)
            })
            .await
            .clone()
    }

    /// Declared subnets classified public, keyed by id
    pub async fn public_subnets(
        &self,
    ) -> Result<Arc<BTreeMap<String, Subnet>>, LookupError> {
        self.public_subnets
            .get_or_init(|| async {
                debug!(lookup = "public_subnets", "fetching from inventory source");
                self.source.public_subnets().await.map(Arc::new)
            })
            .await
            .clone()
    }

    /// All availability zones of the region
    pub async fn availability_zones(&self) -> Result<Arc<Vec<String>>, LookupError> {
        self.availability_zones
            .get_or_init(|| async {
                debug!(lookup = "availability_zones", "fetching from inventory source");
                self.source.availability_zones().await.map(Arc::new)
            })
            .await
            .clone()
    }

    /// The region's instance-type catalog, keyed by type name
    pub async fn instance_types(
        &self,
    ) -> Result<Arc<BTreeMap<String, InstanceType>>, LookupError> {
        self.instance_types
            .get_or_init(|| async {
                debug!(lookup = "instance_types", "fetching from inventory source");
                self.source.instance_types().await.map(Arc::new)
            })
            .await
            .clone()
    }

    /// Id of the VPC containing the declared subnets
    pub async fn vpc_id(&self) -> Result<Arc<String>, LookupError> {
        self.vpc_id
            .get_or_init(|| async {
                debug!(lookup = "vpc_id", "fetching from inventory source");
                self.source.vpc_id().await.map(Arc::new)
            })
            .await
            .clone()
    }
}
