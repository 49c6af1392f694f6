use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::network::parse_target_list;

/// Upper bound on host x port candidates one sweep may cover.
pub const MAX_CANDIDATES: usize = 1 << 20;

/// Number of host/port candidates, rejected above [`MAX_CANDIDATES`].
pub fn check_candidate_count(hosts: usize, ports: usize) -> Result<usize> {
    match hosts.checked_mul(ports) {
        Some(count) if count <= MAX_CANDIDATES => Ok(count),
        _ => bail!(
            "{} hosts x {} ports exceeds the limit of {} candidates; narrow the targets or ports",
            hosts,
            ports,
            MAX_CANDIDATES
        ),
    }
}

/// Producer of reachable `ip:port` candidates for the probe sweep.
#[async_trait]
pub trait TargetSource: Send + Sync {
    fn name(&self) -> &str;

    async fn targets(&self) -> Result<Vec<SocketAddr>>;
}

/// Every host/port pair, unchecked.
pub struct StaticTargets {
    hosts: Vec<IpAddr>,
    ports: Vec<u16>,
}

impl StaticTargets {
    pub fn new(hosts: Vec<IpAddr>, ports: Vec<u16>) -> Self {
        Self { hosts, ports }
    }
}

#[async_trait]
impl TargetSource for StaticTargets {
    fn name(&self) -> &str {
        "static"
    }

    async fn targets(&self) -> Result<Vec<SocketAddr>> {
        check_candidate_count(self.hosts.len(), self.ports.len())?;
        Ok(candidates(&self.hosts, &self.ports).collect())
    }
}

/// Results of an external port scanner (masscan `-oL`, or `ip:port` lines).
pub struct TargetListFile {
    path: PathBuf,
}

impl TargetListFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TargetSource for TargetListFile {
    fn name(&self) -> &str {
        "target-list"
    }

    async fn targets(&self) -> Result<Vec<SocketAddr>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            anyhow::anyhow!("failed to read target list {}: {}", self.path.display(), e)
        })?;
        let targets = parse_target_list(&content);
        info!(path = %self.path.display(), targets = targets.len(), "loaded target list");
        Ok(targets)
    }
}

/// Built-in TCP connect sweep: keeps the host/port pairs that accept a connection.
pub struct ConnectSweep {
    hosts: Vec<IpAddr>,
    ports: Vec<u16>,
    timeout: Duration,
    parallelism: usize,
}

impl ConnectSweep {
    pub fn new(hosts: Vec<IpAddr>, ports: Vec<u16>, timeout: Duration, parallelism: usize) -> Self {
        Self {
            hosts,
            ports,
            timeout,
            parallelism: parallelism.max(1),
        }
    }
}

#[async_trait]
impl TargetSource for ConnectSweep {
    fn name(&self) -> &str {
        "connect-sweep"
    }

    async fn targets(&self) -> Result<Vec<SocketAddr>> {
        check_candidate_count(self.hosts.len(), self.ports.len())?;
        let connect_timeout = self.timeout;

        let mut checks = stream::iter(candidates(&self.hosts, &self.ports))
            .map(|addr| {
                tokio::spawn(async move { is_port_open(addr, connect_timeout).await.then_some(addr) })
            })
            .buffered(self.parallelism);

        let mut open = Vec::new();
        while let Some(check) = checks.next().await {
            open.extend(check?);
        }

        info!(open = open.len(), "connect sweep finished");
        Ok(open)
    }
}

/// True when a TCP connect to `addr` completes within `connect_timeout`.
pub async fn is_port_open(addr: SocketAddr, connect_timeout: Duration) -> bool {
    match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(%addr, error = %e, "port closed");
            false
        }
        Err(_) => false,
    }
}

/// Host-major host x port pairs, produced on demand.
fn candidates<'a>(hosts: &'a [IpAddr], ports: &'a [u16]) -> impl Iterator<Item = SocketAddr> + 'a {
    hosts
        .iter()
        .flat_map(move |&host| ports.iter().map(move |&port| SocketAddr::new(host, port)))
}
