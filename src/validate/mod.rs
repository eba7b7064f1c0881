//! Validation orchestration
//!
//! Composes the individual validators over the configuration tree: the
//! platform level first (endpoints, then topology and the default machine
//! pool), then the control-plane pool and every compute pool. Validators
//! are pure functions over (configuration subtree, inventory cache,
//! aggregator); machine pools validate concurrently and their diagnostics
//! merge back in declared order, so the same input always renders the
//! same diagnostic list.

pub mod dns;
pub mod endpoints;
pub mod image;
pub mod machine;
pub mod topology;

pub use endpoints::{Reachability, TcpProbe, PROBE_TIMEOUT};
pub use machine::{ResourceRequirements, COMPUTE_REQUIREMENTS, CONTROL_PLANE_REQUIREMENTS};

use futures::future::join_all;
use tracing::debug;

use crate::config::InstallConfig;
use crate::diagnostics::{Diagnostic, Diagnostics, FieldPath, ValidationErrors};
use crate::inventory::{DnsSource, Inventory, SessionProvider};

/// Validate the full install configuration against live infrastructure
/// state.
///
/// Returns `Ok(())` when the configuration is provisionable, otherwise
/// every diagnostic the run collected, combined into one error. One
/// validator's remote failure never aborts its siblings; the run always
/// completes.
pub async fn run(
    config: &InstallConfig,
    inventory: &Inventory,
    sessions: &dyn SessionProvider,
    probe: &dyn Reachability,
) -> Result<(), ValidationErrors> {
    let mut diags = Diagnostics::new();
    let platform_path = FieldPath::new("platform").child("aws");

    let Some(platform) = config.platform.aws.as_ref() else {
        diags.push(Diagnostic::required(
            platform_path,
            "validation requires a platform configuration",
        ));
        return diags.into_result();
    };

    image::validate_image_resolution(config, platform, &mut diags);

    // Broken endpoints imply long timeouts in every check that would use
    // them, so the platform checks behind them are skipped outright.
    let mut endpoint_diags = Diagnostics::new();
    endpoints::validate_service_endpoints(
        &platform_path,
        platform,
        probe,
        sessions,
        &mut endpoint_diags,
    )
    .await;
    let endpoints_ok = endpoint_diags.is_empty();
    diags.extend(endpoint_diags);

    if endpoints_ok {
        if !platform.subnets.is_empty() {
            topology::validate_subnets(
                &platform_path.child("subnets"),
                &platform.subnets,
                &config.networking,
                config.publish,
                inventory,
                &mut diags,
            )
            .await;
        }
        if let Some(default_pool) = platform.default_machine_platform.as_ref() {
            machine::validate_machine_pool(
                &platform_path.child("defaultMachinePlatform"),
                platform,
                default_pool,
                &CONTROL_PLANE_REQUIREMENTS,
                inventory,
                &mut diags,
            )
            .await;
        }
    }

    // Pools are independent of each other: validate them concurrently,
    // merge in declared order.
    let mut jobs = Vec::new();
    if let Some(pool) = config.control_plane.as_ref() {
        if let Some(aws) = pool.platform.aws.as_ref() {
            jobs.push((
                FieldPath::new("controlPlane").child("platform").child("aws"),
                aws,
                &CONTROL_PLANE_REQUIREMENTS,
            ));
        }
    }
    for (idx, pool) in config.compute.iter().enumerate() {
        if let Some(aws) = pool.platform.aws.as_ref() {
            jobs.push((
                FieldPath::new("compute")
                    .index(idx)
                    .child("platform")
                    .child("aws"),
                aws,
                &COMPUTE_REQUIREMENTS,
            ));
        }
    }
    let results = join_all(jobs.into_iter().map(|(path, pool, requirements)| async move {
        let mut pool_diags = Diagnostics::new();
        machine::validate_machine_pool(&path, platform, pool, requirements, inventory, &mut pool_diags)
            .await;
        pool_diags
    }))
    .await;
    for pool_diags in results {
        diags.extend(pool_diags);
    }

    debug!(diagnostics = diags.len(), "configuration validation finished");
    diags.into_result()
}

/// Validate the target DNS zone immediately before provisioning.
///
/// Independent of [`run`]; invoked later in the pipeline once a live DNS
/// client is available.
pub async fn run_pre_provision(
    config: &InstallConfig,
    inventory: &Inventory,
    dns: &dyn DnsSource,
) -> Result<(), ValidationErrors> {
    let mut diags = Diagnostics::new();

    let Some(platform) = config.platform.aws.as_ref() else {
        diags.push(Diagnostic::required(
            FieldPath::new("platform").child("aws"),
            "validation requires a platform configuration",
        ));
        return diags.into_result();
    };

    dns::validate_zone_conflicts(config, platform, dns, inventory, &mut diags).await;
    diags.into_result()
}
