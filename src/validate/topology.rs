//! Subnet topology validation
//!
//! Reconciles the declared subnet ids against live classification, zone
//! membership and CIDR ranges. All walks over live subnet sets iterate in
//! id order so the same input always produces the same diagnostics in the
//! same order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ipnet::IpNet;
use tracing::warn;

use crate::config::{Networking, PublishingStrategy};
use crate::diagnostics::{Diagnostic, Diagnostics, FieldPath};
use crate::inventory::{Inventory, Subnet};

/// Public/private classification derived from route-table egress
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tier {
    Private,
    Public,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Private => f.write_str("private"),
            Tier::Public => f.write_str("public"),
        }
    }
}

/// Validate the declared subnets against live topology.
///
/// Callers skip this entirely when no subnets are declared; absent
/// subnets defer to per-zone discovery during provisioning.
pub(crate) async fn validate_subnets(
    path: &FieldPath,
    declared: &[String],
    networking: &Networking,
    publish: PublishingStrategy,
    inventory: &Inventory,
    diags: &mut Diagnostics,
) {
    let private = match inventory.private_subnets().await {
        Ok(subnets) => subnets,
        Err(err) => {
            warn!(error = %err, "private subnet lookup failed");
            diags.push(Diagnostic::invalid(
                path.clone(),
                format!("{declared:?}"),
                err.to_string(),
            ));
            return;
        }
    };
    if private.is_empty() {
        diags.push(Diagnostic::invalid(
            path.clone(),
            format!("{declared:?}"),
            "No private subnets found",
        ));
    }

    let public = match inventory.public_subnets().await {
        Ok(subnets) => subnets,
        Err(err) => {
            warn!(error = %err, "public subnet lookup failed");
            diags.push(Diagnostic::invalid(
                path.clone(),
                format!("{declared:?}"),
                err.to_string(),
            ));
            return;
        }
    };

    let index_of: BTreeMap<&str, usize> = declared
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect();

    // Ids classified as neither tier do not exist in the VPC.
    for (idx, id) in declared.iter().enumerate() {
        if !private.contains_key(id) && !public.contains_key(id) {
            diags.push(Diagnostic::invalid(
                path.index(idx),
                id,
                "subnet not found in the VPC",
            ));
        }
    }

    let machine_networks: Vec<IpNet> = networking
        .machine_network
        .iter()
        .filter_map(|entry| entry.cidr.parse().ok())
        .collect();

    check_subnet_cidrs(path, &index_of, &private, &machine_networks, diags);
    check_subnet_cidrs(path, &index_of, &public, &machine_networks, diags);
    check_duplicate_zones(path, &index_of, &private, Tier::Private, diags);
    check_duplicate_zones(path, &index_of, &public, Tier::Public, diags);

    // External clusters need a public ingress point in every zone that
    // hosts private machines.
    if publish == PublishingStrategy::External {
        let private_zones: BTreeSet<&str> = private.values().map(|s| s.zone.as_str()).collect();
        let public_zones: BTreeSet<&str> = public.values().map(|s| s.zone.as_str()).collect();
        let missing: Vec<&str> = private_zones.difference(&public_zones).copied().collect();
        if !missing.is_empty() {
            diags.push(Diagnostic::invalid(
                path.clone(),
                format!("{declared:?}"),
                format!("No public subnet provided for zones [{}]", missing.join(", ")),
            ));
        }
    }
}

/// Path for one declared subnet, falling back to the list path when the
/// id was not declared (live sets only ever contain declared ids)
fn indexed_path(path: &FieldPath, index_of: &BTreeMap<&str, usize>, id: &str) -> FieldPath {
    index_of
        .get(id)
        .map(|idx| path.index(*idx))
        .unwrap_or_else(|| path.clone())
}

/// Every subnet CIDR must parse and its network address must fall inside
/// some declared machine-network entry
fn check_subnet_cidrs(
    path: &FieldPath,
    index_of: &BTreeMap<&str, usize>,
    subnets: &BTreeMap<String, Subnet>,
    machine_networks: &[IpNet],
    diags: &mut Diagnostics,
) {
    for (id, subnet) in subnets {
        let field = indexed_path(path, index_of, id);
        let net: IpNet = match subnet.cidr.parse() {
            Ok(net) => net,
            Err(err) => {
                diags.push(Diagnostic::invalid(field, id, err.to_string()));
                continue;
            }
        };
        let start = net.network();
        if !machine_networks.iter().any(|m| m.contains(&start)) {
            diags.push(Diagnostic::invalid(
                field,
                id,
                format!(
                    "subnet's CIDR range start {start} is outside of the specified machine networks"
                ),
            ));
        }
    }
}

/// Within one tier a zone maps to at most one subnet.
///
/// Ids are walked in sorted order, so the first id in a zone claims it and
/// every later id in the same zone is rejected with both ids named.
fn check_duplicate_zones(
    path: &FieldPath,
    index_of: &BTreeMap<&str, usize>,
    subnets: &BTreeMap<String, Subnet>,
    tier: Tier,
    diags: &mut Diagnostics,
) {
    let mut claimed: BTreeMap<&str, &str> = BTreeMap::new();
    for (id, subnet) in subnets {
        match claimed.get(subnet.zone.as_str()) {
            Some(first) => {
                diags.push(Diagnostic::invalid(
                    indexed_path(path, index_of, id),
                    id,
                    format!("{tier} subnet {first} is also in zone {}", subnet.zone),
                ));
            }
            None => {
                claimed.insert(subnet.zone.as_str(), id);
            }
        }
    }
}
