use anyhow::{anyhow, bail, Result};

/// Ports where SSE and MCP development servers usually listen.
pub const SSE_PORTS: &[u16] = &[
    80, 443, 3000, 3001, 5000, 5173, 6274, 8000, 8001, 8008, 8080, 8081, 8090, 8888, 9000, 9090,
];

pub const WEB_PORTS: &[u16] = &[80, 443, 8000, 8008, 8080, 8443, 8888];

/// Parse a port expression such as `8000,8080-8090,sse` into a sorted, deduplicated list.
pub fn parse_ports(spec: &str) -> Result<Vec<u16>> {
    let mut ports = Vec::new();

    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.to_ascii_lowercase().as_str() {
            "sse" => ports.extend_from_slice(SSE_PORTS),
            "web" => ports.extend_from_slice(WEB_PORTS),
            "all" => ports.extend(1..=u16::MAX),
            _ => {
                if let Some((start, end)) = part.split_once('-') {
                    let start = parse_port(start)?;
                    let end = parse_port(end)?;
                    if start > end {
                        bail!("invalid port range {}: start is after end", part);
                    }
                    ports.extend(start..=end);
                } else {
                    ports.push(parse_port(part)?);
                }
            }
        }
    }

    if ports.is_empty() {
        bail!("no ports given");
    }

    ports.sort_unstable();
    ports.dedup();
    Ok(ports)
}

fn parse_port(value: &str) -> Result<u16> {
    let port: u16 = value
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid port: {}", value.trim()))?;
    if port == 0 {
        bail!("port 0 is not a valid target port");
    }
    Ok(port)
}
