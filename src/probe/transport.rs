use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tracing::debug;

use super::error::TransportError;
use crate::config::ProbeConfig;

const READ_BUFFER_SIZE: usize = 4096;

/// The single request a probe sends. `Connection: close` lets the read loop
/// treat end-of-stream as the end of the response.
pub fn build_request(config: &ProbeConfig) -> String {
    format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nAccept: text/event-stream\r\nConnection: close\r\n\r\n",
        config.path(),
        config.authority()
    )
}

/// Connect, send one request and collect the raw response bytes.
///
/// Reading stops when the peer closes, when a single read times out, when the
/// overall read deadline passes, or once `max_response_bytes` are held. None of
/// those is an error: whatever arrived is returned. Only a response with zero
/// bytes is reported as a failure. The socket is dropped on every return path.
pub async fn fetch(config: &ProbeConfig) -> Result<Vec<u8>, TransportError> {
    let addr = config.authority();

    let connect = TcpStream::connect((config.host(), config.port()));
    let mut stream = match timeout(config.connect_timeout(), connect).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(TransportError::Connect { addr, source }),
        Err(_) => {
            return Err(TransportError::ConnectTimeout {
                addr,
                timeout_ms: millis(config.connect_timeout()),
            })
        }
    };

    let request = build_request(config);
    match timeout(config.read_timeout(), stream.write_all(request.as_bytes())).await {
        Ok(Ok(())) => {}
        Ok(Err(source)) => return Err(TransportError::Send { addr, source }),
        Err(_) => {
            let source = io::Error::new(io::ErrorKind::TimedOut, "write timed out");
            return Err(TransportError::Send { addr, source });
        }
    }

    let raw = read_response(&mut stream, config)
        .await
        .map_err(|source| TransportError::Receive { addr: addr.clone(), source })?;

    if raw.is_empty() {
        return Err(TransportError::NoData { addr });
    }

    debug!(target_addr = %addr, bytes = raw.len(), "response collected");
    Ok(raw)
}

/// Accumulate bytes verbatim. Line framing is left entirely to the parsers.
/// A read error is only surfaced when nothing has been received yet.
pub async fn read_response<R>(reader: &mut R, config: &ProbeConfig) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let deadline = Instant::now() + config.read_deadline();
    let mut raw = Vec::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!(bytes = raw.len(), "read deadline reached");
            break;
        }

        match timeout(remaining.min(config.read_timeout()), reader.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                let room = config.max_response_bytes().saturating_sub(raw.len());
                raw.extend_from_slice(&buf[..n.min(room)]);
                if raw.len() >= config.max_response_bytes() {
                    debug!(bytes = raw.len(), "response size cap reached");
                    break;
                }
            }
            Ok(Err(e)) => {
                if raw.is_empty() {
                    return Err(e);
                }
                debug!(error = %e, bytes = raw.len(), "read failed, keeping partial response");
                break;
            }
            Err(_) => break,
        }
    }

    Ok(raw)
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanSettings;
    use crate::probe::testing::{
        closed_port, fast_config, fast_settings, spawn_server, spawn_silent_server, spawn_streaming_server,
    };
    use std::net::SocketAddr;

    fn config_with(settings: ScanSettings, addr: SocketAddr) -> ProbeConfig {
        settings.probe_config(addr.ip().to_string(), addr.port(), "/sse")
    }

    #[test]
    fn test_build_request_shape() {
        let config = ProbeConfig::new("192.168.1.20", 8000).with_path("/mcp/sse");
        assert_eq!(
            build_request(&config),
            "GET /mcp/sse HTTP/1.1\r\nHost: 192.168.1.20:8000\r\nAccept: text/event-stream\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn test_build_request_brackets_ipv6_host() {
        let config = ProbeConfig::new("::1", 9000);
        assert!(build_request(&config).contains("\r\nHost: [::1]:9000\r\n"));
    }

    #[tokio::test]
    async fn test_fetch_reads_until_peer_closes() {
        let response = b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\n\r\nevent: ping\ndata: 1\n\n".to_vec();
        let addr = spawn_server(response.clone(), Duration::ZERO).await;

        let raw = fetch(&fast_config(addr)).await.unwrap();
        assert_eq!(raw, response);
    }

    #[tokio::test]
    async fn test_fetch_keeps_partial_data_on_read_timeout() {
        let response = b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\n\r\n: keep-alive\n".to_vec();
        let addr = spawn_server(response.clone(), Duration::from_secs(3)).await;

        let raw = fetch(&fast_config(addr)).await.unwrap();
        assert_eq!(raw, response);
    }

    #[tokio::test]
    async fn test_read_deadline_bounds_chatty_streams() {
        let addr = spawn_streaming_server(b": ping\n".to_vec(), Duration::from_millis(20)).await;
        let settings = ScanSettings {
            read_deadline: Duration::from_millis(300),
            ..fast_settings()
        };
        let config = config_with(settings, addr);

        let started = std::time::Instant::now();
        let raw = fetch(&config).await.unwrap();
        assert!(!raw.is_empty());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_response_size_is_capped() {
        let addr = spawn_server(vec![b'x'; 10_000], Duration::ZERO).await;
        let settings = ScanSettings {
            max_response_bytes: 1000,
            ..fast_settings()
        };
        let config = config_with(settings, addr);

        let raw = fetch(&config).await.unwrap();
        assert_eq!(raw.len(), 1000);
    }

    #[tokio::test]
    async fn test_silent_peer_is_no_data() {
        let addr = spawn_silent_server().await;
        let result = fetch(&fast_config(addr)).await;
        assert!(matches!(result, Err(TransportError::NoData { .. })));
    }

    #[tokio::test]
    async fn test_refused_connection_is_connect_error() {
        let addr = closed_port().await;
        let result = fetch(&fast_config(addr)).await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_read_response_preserves_bytes_verbatim() {
        let input = b"HTTP/1.1 200 OK\r\n\r\n5\r\nhello\r\n0\r\n\r\n".to_vec();
        let mut reader = &input[..];
        let raw = read_response(&mut reader, &ProbeConfig::new("127.0.0.1", 1)).await.unwrap();
        assert_eq!(raw, input);
    }

    #[test]
    fn test_millis_saturates_instead_of_truncating() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);

        let err = TransportError::ConnectTimeout {
            addr: "10.0.0.1:8000".to_string(),
            timeout_ms: millis(Duration::MAX),
        };
        assert!(err.to_string().ends_with(&format!("after {}ms", u64::MAX)));
    }
}
