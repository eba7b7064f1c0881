//! Service-endpoint validation
//!
//! Endpoint misconfiguration otherwise shows up as long timeouts deep
//! inside provisioning, so every declared override is checked for URL
//! validity and TCP reachability up front, and the region itself must
//! resolve within a known partition or through explicit overrides.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::net::TcpStream;
use tracing::{debug, warn};
use url::Url;

use crate::config::Platform;
use crate::diagnostics::{Diagnostic, Diagnostics, FieldPath};
use crate::endpoints::{partition_for_region, EndpointResolver, COMPUTE_SERVICE, REQUIRED_SERVICES};
use crate::inventory::SessionProvider;

/// Bounded wait for a single reachability probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Network reachability probe.
///
/// A seam for tests; the default implementation opens a real TCP
/// connection with a bounded wait.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Reachability: Send + Sync {
    /// Attempt a TCP connection to `host:port` within [`PROBE_TIMEOUT`]
    async fn probe(&self, host: &str, port: u16) -> std::io::Result<()>;
}

/// Probe using a real TCP connection
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpProbe;

#[async_trait]
impl Reachability for TcpProbe {
    async fn probe(&self, host: &str, port: u16) -> std::io::Result<()> {
        match tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(_elapsed) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connection to {host}:{port} timed out"),
            )),
        }
    }
}

/// Parse a URL and probe its host on the declared or scheme-default port
async fn probe_url(probe: &dyn Reachability, raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|err| err.to_string())?;
    let host = url
        .host_str()
        .ok_or_else(|| format!("URL {raw:?} has no host"))?
        .to_string();
    let port = url.port_or_known_default().unwrap_or(443);
    debug!(host = %host, port, "probing endpoint");
    probe
        .probe(&host, port)
        .await
        .map_err(|err| err.to_string())
}

/// Validate declared service-endpoint overrides and region resolvability
pub(crate) async fn validate_service_endpoints(
    platform_path: &FieldPath,
    platform: &Platform,
    probe: &dyn Reachability,
    sessions: &dyn SessionProvider,
    diags: &mut Diagnostics,
) {
    let endpoints_path = platform_path.child("serviceEndpoints");
    let region = platform.region.as_str();

    let mut compute_override_reachable = false;
    for (idx, endpoint) in platform.service_endpoints.iter().enumerate() {
        match probe_url(probe, &endpoint.url).await {
            Ok(()) => {
                if endpoint.name == COMPUTE_SERVICE {
                    compute_override_reachable = true;
                }
            }
            Err(err) => {
                warn!(service = %endpoint.name, url = %endpoint.url, error = %err, "endpoint probe failed");
                diags.push(Diagnostic::invalid(
                    endpoints_path.index(idx).child("url"),
                    &endpoint.url,
                    err,
                ));
            }
        }
    }

    if let Some(partition) = partition_for_region(region) {
        // A region its partition does not enumerate may still exist (newly
        // launched); with no reachable compute override to vouch for it,
        // probe the region's default compute endpoint as an existence check.
        if !partition.is_enumerated(region) && !compute_override_reachable {
            match sessions.session(Some(region)).await {
                Ok(session) => {
                    if let Err(err) = probe_url(probe, &session.compute_endpoint).await {
                        diags.push(Diagnostic::invalid(
                            platform_path.child("region"),
                            region,
                            err,
                        ));
                    }
                }
                Err(err) => {
                    diags.push(Diagnostic::invalid(
                        platform_path.child("region"),
                        region,
                        err.to_string(),
                    ));
                }
            }
        }
        return;
    }

    // The region is unknown to every published partition: under strict
    // matching only explicit overrides resolve, and every required service
    // must have one. Failures are aggregated so all missing services are
    // reported together.
    let resolver = EndpointResolver::new(region, &platform.service_endpoints);
    let failures: Vec<String> = REQUIRED_SERVICES
        .iter()
        .filter_map(|service| resolver.resolve(service).err())
        .map(|err| err.to_string())
        .collect();
    if !failures.is_empty() {
        let declared: Vec<&str> = platform
            .service_endpoints
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        diags.push(Diagnostic::invalid(
            endpoints_path,
            format!("{declared:?}"),
            failures.join("; "),
        ));
    }
}
