//! Compares the system resolver against a trusted public resolver

use super::CheckReport;
use crate::errors::{DashboardError, Result};
use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing::debug;

pub const CHECK_NAME: &str = "DNS Consistency Check";

#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve_ipv4(&self, host: &str) -> Result<BTreeSet<Ipv4Addr>>;
}

/// Whatever the host is configured to use
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve_ipv4(&self, host: &str) -> Result<BTreeSet<Ipv4Addr>> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| DashboardError::Dns(format!("Could not resolve '{}' locally: {}", host, e)))?;

        Ok(addrs
            .filter_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(*v4.ip()),
                SocketAddr::V6(_) => None,
            })
            .collect())
    }
}

/// Plain UDP/TCP queries to one nameserver, bypassing local configuration
pub struct HickoryResolver {
    server: IpAddr,
    timeout: Duration,
}

impl HickoryResolver {
    pub fn new(server: IpAddr, timeout: Duration) -> Self {
        Self { server, timeout }
    }

    /// Single attempt, no hosts file: only the nameserver may answer
    fn options(&self) -> ResolverOpts {
        let mut opts = ResolverOpts::default();
        opts.use_hosts_file = false;
        opts.timeout = self.timeout;
        opts.attempts = 1;
        opts
    }
}

#[async_trait]
impl Resolver for HickoryResolver {
    async fn resolve_ipv4(&self, host: &str) -> Result<BTreeSet<Ipv4Addr>> {
        let nameservers = NameServerConfigGroup::from_ips_clear(&[self.server], 53, true);
        let config = ResolverConfig::from_parts(None, vec![], nameservers);
        let resolver = TokioAsyncResolver::tokio(config, self.options());

        let lookup = resolver.ipv4_lookup(host).await.map_err(|e| {
            DashboardError::Dns(format!("Could not resolve '{}' via {}: {}", host, self.server, e))
        })?;

        Ok(lookup.iter().map(|a| a.0).collect())
    }
}

fn join(ips: &BTreeSet<Ipv4Addr>) -> String {
    ips.iter().map(|ip| ip.to_string()).collect::<Vec<_>>().join(", ")
}

/// Every locally resolved address must also be known to the trusted resolver.
///
/// Load-balanced names often return a subset locally, which is fine.
pub fn compare_resolutions(system: &BTreeSet<Ipv4Addr>, trusted: &BTreeSet<Ipv4Addr>) -> CheckReport {
    if system.is_empty() {
        return CheckReport::fail(CHECK_NAME, "Local resolver returned no IPv4 addresses");
    }

    if system.is_subset(trusted) {
        CheckReport::ok(
            CHECK_NAME,
            format!("DNS resolution is consistent. IP(s): {}", join(system)),
        )
    } else {
        CheckReport::warning(
            CHECK_NAME,
            format!(
                "DNS mismatch detected! Local IPs: {}. Trusted IPs: {}",
                join(system),
                join(trusted)
            ),
        )
    }
}

pub async fn check_dns_consistency(
    host: &str,
    system: &dyn Resolver,
    trusted: &dyn Resolver,
) -> CheckReport {
    let (local, remote) = tokio::join!(system.resolve_ipv4(host), trusted.resolve_ipv4(host));

    match (local, remote) {
        (Ok(local), Ok(remote)) => {
            debug!("{} resolved locally to {:?}, trusted {:?}", host, local, remote);
            compare_resolutions(&local, &remote)
        }
        (Err(e), _) | (_, Err(e)) => CheckReport::fail(CHECK_NAME, e.to_string()),
    }
}
