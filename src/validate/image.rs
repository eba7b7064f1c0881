//! Machine image resolution
//!
//! Provisioning needs a bootable machine image for every pool. One can
//! come from the region's stock image set, from the platform or
//! default-pool declaration, from every individual pool, or from a
//! cross-region copy inside the standard partition. When none of those
//! applies the install cannot proceed.

use crate::config::{InstallConfig, Platform};
use crate::diagnostics::{Diagnostic, Diagnostics, FieldPath};
use crate::endpoints::{partition_for_region, STANDARD_PARTITION};

/// Regions that ship a stock machine image
const STOCK_IMAGE_REGIONS: [&str; 20] = [
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-south-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ca-central-1",
    "eu-central-1",
    "eu-north-1",
    "eu-south-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
];

/// Check that a machine image is resolvable for every pool
pub(crate) fn validate_image_resolution(
    config: &InstallConfig,
    platform: &Platform,
    diags: &mut Diagnostics,
) {
    // Stock image available in the region.
    if STOCK_IMAGE_REGIONS.contains(&platform.region.as_str()) {
        return;
    }

    // Image declared for the whole platform.
    if platform.ami_id.is_some() {
        return;
    }

    // Image declared for the default machine pool.
    if platform
        .default_machine_platform
        .as_ref()
        .map(|pool| pool.ami_id.is_some())
        .unwrap_or(false)
    {
        return;
    }

    // Image declared on every pool that will actually run machines.
    let control_plane_has_image = config
        .control_plane
        .as_ref()
        .and_then(|pool| pool.platform.aws.as_ref())
        .map(|aws| aws.ami_id.is_some())
        .unwrap_or(false);
    let computes_have_image = config.compute.iter().all(|pool| {
        pool.replicas == 0
            || pool
                .platform
                .aws
                .as_ref()
                .map(|aws| aws.ami_id.is_some())
                .unwrap_or(false)
    });
    if control_plane_has_image && computes_have_image {
        return;
    }

    // Standard-partition regions can copy the stock image cross-region.
    if partition_for_region(&platform.region)
        .map(|partition| partition.id == STANDARD_PARTITION)
        .unwrap_or(false)
    {
        return;
    }

    diags.push(Diagnostic::required(
        FieldPath::new("platform").child("aws").child("amiId"),
        "machine image must be provided",
    ));
}
