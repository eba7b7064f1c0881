//! Machine pool validation
//!
//! Checks a pool's declared zones against the zones actually available to
//! the install, and its instance type against the role's resource floor.

use std::collections::BTreeSet;

use tracing::warn;

use crate::config::{MachinePoolPlatform, Platform};
use crate::diagnostics::{Diagnostic, Diagnostics, FieldPath};
use crate::inventory::Inventory;

/// Minimum instance capacity for a machine-pool role
#[derive(Clone, Copy, Debug)]
pub struct ResourceRequirements {
    /// Minimum vCPU count
    pub min_vcpus: i64,
    /// Minimum memory in MiB
    pub min_memory_mib: i64,
}

/// Floor for control-plane machines (also applied to the platform's
/// default machine pool)
pub const CONTROL_PLANE_REQUIREMENTS: ResourceRequirements = ResourceRequirements {
    min_vcpus: 4,
    min_memory_mib: 16384,
};

/// Floor for compute machines
pub const COMPUTE_REQUIREMENTS: ResourceRequirements = ResourceRequirements {
    min_vcpus: 2,
    min_memory_mib: 8192,
};

/// Validate one machine pool against live zone and instance-type facts
pub(crate) async fn validate_machine_pool(
    path: &FieldPath,
    platform: &Platform,
    pool: &MachinePoolPlatform,
    requirements: &ResourceRequirements,
    inventory: &Inventory,
    diags: &mut Diagnostics,
) {
    if !pool.zones.is_empty() {
        // Zones come from the private subnets when the install uses
        // pre-existing subnets, otherwise from the region's full zone list.
        let available: BTreeSet<String> = if !platform.subnets.is_empty() {
            match inventory.private_subnets().await {
                Ok(subnets) => subnets.values().map(|s| s.zone.clone()).collect(),
                Err(err) => {
                    warn!(error = %err, "private subnet lookup failed");
                    diags.push(Diagnostic::internal(path.clone(), err));
                    return;
                }
            }
        } else {
            match inventory.availability_zones().await {
                Ok(zones) => zones.iter().cloned().collect(),
                Err(err) => {
                    warn!(error = %err, "availability zone lookup failed");
                    diags.push(Diagnostic::internal(path.clone(), err));
                    return;
                }
            }
        };

        let missing: Vec<&str> = pool
            .zones
            .iter()
            .filter(|zone| !available.contains(*zone))
            .map(|zone| zone.as_str())
            .collect();
        if !missing.is_empty() {
            let mut missing = missing;
            missing.sort_unstable();
            diags.push(Diagnostic::invalid(
                path.child("zones"),
                format!("{:?}", pool.zones),
                format!("No subnets provided for zones [{}]", missing.join(", ")),
            ));
        }
    }

    if let Some(instance_type) = pool.instance_type.as_deref() {
        let catalog = match inventory.instance_types().await {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!(error = %err, "instance type lookup failed");
                diags.push(Diagnostic::internal(path.clone(), err));
                return;
            }
        };
        match catalog.get(instance_type) {
            Some(descriptor) => {
                // The two floors are independent; a type failing both
                // produces two diagnostics.
                if descriptor.vcpus < requirements.min_vcpus {
                    diags.push(Diagnostic::invalid(
                        path.child("type"),
                        instance_type,
                        format!(
                            "instance type does not meet minimum resource requirements of {} vCPUs",
                            requirements.min_vcpus
                        ),
                    ));
                }
                if descriptor.memory_mib < requirements.min_memory_mib {
                    diags.push(Diagnostic::invalid(
                        path.child("type"),
                        instance_type,
                        format!(
                            "instance type does not meet minimum resource requirements of {} MiB Memory",
                            requirements.min_memory_mib
                        ),
                    ));
                }
            }
            None => {
                diags.push(Diagnostic::invalid(
                    path.child("type"),
                    instance_type,
                    format!("instance type {instance_type} not found"),
                ));
            }
        }
    }
}
