use anyhow::{anyhow, bail, Context, Result};
use ipnet::IpNet;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use tracing::{debug, warn};

/// Upper bound on addresses produced by one range or CIDR block.
pub const MAX_EXPANDED_HOSTS: usize = 65_536;

/// Parse a target expression: comma separated IPs, hostnames, `IP1-IP2` ranges
/// (or `10.0.0.1-20` last-octet shorthand) and CIDR blocks.
pub fn parse_targets(spec: &str) -> Result<Vec<IpAddr>> {
    let mut targets = Vec::new();

    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if part.contains('/') {
            targets.extend(expand_cidr(part)?);
        } else if let Some((start, end)) = part.split_once('-').filter(|(s, _)| s.parse::<Ipv4Addr>().is_ok()) {
            targets.extend(expand_range(start, end)?);
        } else if let Ok(ip) = part.parse::<IpAddr>() {
            targets.push(ip);
        } else {
            targets.push(resolve_host(part)?);
        }
    }

    if targets.is_empty() {
        bail!("no targets given");
    }

    Ok(dedup(targets))
}

fn expand_cidr(part: &str) -> Result<Vec<IpAddr>> {
    let net: IpNet = part.parse().map_err(|e| anyhow!("invalid CIDR {}: {}", part, e))?;
    let hosts: Vec<IpAddr> = net.hosts().take(MAX_EXPANDED_HOSTS + 1).collect();
    if hosts.len() > MAX_EXPANDED_HOSTS {
        bail!("CIDR {} expands to more than {} hosts", part, MAX_EXPANDED_HOSTS);
    }
    Ok(hosts)
}

fn expand_range(start: &str, end: &str) -> Result<Vec<IpAddr>> {
    let start: Ipv4Addr = start.parse()?;
    let end: Ipv4Addr = match end.parse::<u8>() {
        Ok(last_octet) => {
            let [a, b, c, _] = start.octets();
            Ipv4Addr::new(a, b, c, last_octet)
        }
        Err(_) => end
            .parse()
            .map_err(|_| anyhow!("invalid range end: {}", end))?,
    };

    let (first, last) = (u32::from(start), u32::from(end));
    if first > last {
        bail!("invalid range {}-{}: start is after end", start, end);
    }
    if (last - first) as usize >= MAX_EXPANDED_HOSTS {
        bail!("range {}-{} expands to more than {} hosts", start, end, MAX_EXPANDED_HOSTS);
    }

    Ok((first..=last).map(|n| IpAddr::V4(Ipv4Addr::from(n))).collect())
}

fn resolve_host(host: &str) -> Result<IpAddr> {
    let addr = format!("{}:0", host)
        .to_socket_addrs()
        .with_context(|| format!("failed to resolve {}", host))?
        .next()
        .ok_or_else(|| anyhow!("failed to resolve hostname {}", host))?;

    debug!(host, ip = %addr.ip(), "resolved target");
    Ok(addr.ip())
}

/// Extract open TCP endpoints from scanner output.
///
/// Accepts masscan list lines (`open tcp 8000 10.0.0.7 1700000000`) and plain
/// `ip:port` / `[ipv6]:port` lines. Comments, closed ports and anything
/// unrecognised are skipped.
pub fn parse_target_list(content: &str) -> Vec<SocketAddr> {
    let mut targets = Vec::new();
    let mut skipped = 0usize;

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_list_line(line) {
            Some(addr) => targets.push(addr),
            None => {
                debug!(line = number + 1, content = line, "skipping target list line");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "ignored unrecognised or non-open target list lines");
    }

    dedup(targets)
}

fn parse_list_line(line: &str) -> Option<SocketAddr> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.as_slice() {
        ["open", "tcp", port, ip, ..] => {
            let port: u16 = port.parse().ok()?;
            let ip: IpAddr = ip.parse().ok()?;
            Some(SocketAddr::new(ip, port))
        }
        [single] => single.parse().ok(),
        _ => None,
    }
}

fn dedup<T: Copy + Eq + std::hash::Hash>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(*item)).collect()
}
