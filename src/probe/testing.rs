//! Local TCP fixtures and encoders shared by the probe and scanner tests.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::http::find;
use super::SseEvent;
use crate::config::{ProbeConfig, ScanSettings, DEFAULT_MAX_RESPONSE_BYTES, DEFAULT_PATH};

/// Short timeouts so tests against local sockets stay fast.
pub fn fast_settings() -> ScanSettings {
    ScanSettings {
        connect_timeout: Duration::from_millis(500),
        read_timeout: Duration::from_millis(200),
        read_deadline: Duration::from_secs(2),
        max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
    }
}

pub fn fast_config(addr: SocketAddr) -> ProbeConfig {
    fast_settings().probe_config(addr.ip().to_string(), addr.port(), DEFAULT_PATH)
}

/// Frame `payload` as chunks of at most `chunk_size` bytes, ending with the zero chunk.
pub fn encode_chunked(payload: &[u8], chunk_size: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in payload.chunks(chunk_size) {
        out.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        out.extend_from_slice(chunk);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}

pub fn encode_events(events: &[SseEvent]) -> String {
    events
        .iter()
        .map(|event| format!("event: {}\r\ndata: {}\r\n\r\n", event.event_type, event.data))
        .collect()
}

/// A complete SSE response, chunked as a real server would send it.
pub fn sse_response(events: &[SseEvent]) -> Vec<u8> {
    let mut response =
        b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    response.extend(encode_chunked(encode_events(events).as_bytes(), 16));
    response
}

async fn read_request(socket: &mut TcpStream) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                request.extend_from_slice(&buf[..n]);
                if find(&request, b"\r\n\r\n").is_some() {
                    break;
                }
            }
        }
    }
}

/// Answer every connection with `response`, then keep the socket open for `hold_open`.
pub async fn spawn_server(response: Vec<u8>, hold_open: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let response = response.clone();
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let _ = socket.write_all(&response).await;
                tokio::time::sleep(hold_open).await;
            });
        }
    });

    addr
}

/// Send the response head, then `line` every `every` until the client goes away.
pub async fn spawn_streaming_server(line: Vec<u8>, every: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let line = line.clone();
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let head = b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\n\r\n";
                if socket.write_all(head).await.is_err() {
                    return;
                }
                loop {
                    if socket.write_all(&line).await.is_err() {
                        break;
                    }
                    tokio::time::sleep(every).await;
                }
            });
        }
    });

    addr
}

/// Accept connections and never answer.
pub async fn spawn_silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut socket).await;
                tokio::time::sleep(Duration::from_secs(5)).await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
