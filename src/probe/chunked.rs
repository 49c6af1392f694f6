//! Best-effort decoding of `Transfer-Encoding: chunked` bodies.
//!
//! Detection is by content sniffing only: a body that opens with a hex size
//! line is treated as chunked whatever the headers say. Truncated or malformed
//! input never fails, the bytes reconstructed so far are returned.

use std::borrow::Cow;
use tracing::debug;

/// True when the body starts with `<hex digits>[;extension]` followed by a line terminator.
pub fn looks_chunked(body: &[u8]) -> bool {
    let digits = body.iter().take_while(|b| b.is_ascii_hexdigit()).count();
    if digits == 0 {
        return false;
    }

    match body.get(digits) {
        Some(b'\r') => body.get(digits + 1) == Some(&b'\n'),
        Some(b'\n') => true,
        Some(b';') => body[digits..].contains(&b'\n'),
        _ => false,
    }
}

/// Reassemble a chunked body; a body without the chunked marker is returned as is.
pub fn decode(body: &[u8]) -> Cow<'_, [u8]> {
    if !looks_chunked(body) {
        return Cow::Borrowed(body);
    }

    let mut decoded = Vec::with_capacity(body.len());
    let mut pos = 0;

    while pos < body.len() {
        let Some(line_len) = body[pos..].iter().position(|&b| b == b'\n') else {
            debug!(offset = pos, "chunk size line truncated");
            break;
        };

        let Some(size) = parse_chunk_size(&body[pos..pos + line_len]) else {
            debug!(offset = pos, "unparsable chunk size, stopping");
            break;
        };

        if size == 0 {
            break;
        }

        let start = pos + line_len + 1;
        let end = start.saturating_add(size).min(body.len());
        if end - start < size {
            debug!(declared = size, available = end - start, "chunk truncated");
        }
        decoded.extend_from_slice(&body[start..end]);

        pos = end;
        if body[pos..].starts_with(b"\r\n") {
            pos += 2;
        } else if body[pos..].starts_with(b"\n") {
            pos += 1;
        }
    }

    Cow::Owned(decoded)
}

/// Parse one size line (without its `\n`). Chunk extensions after `;` are dropped.
fn parse_chunk_size(line: &[u8]) -> Option<usize> {
    let line = std::str::from_utf8(line).ok()?;
    let line = line.strip_suffix('\r').unwrap_or(line);
    let size = line.split(';').next().unwrap_or("").trim();
    usize::from_str_radix(size, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testing::encode_chunked;

    #[test]
    fn test_detection() {
        assert!(looks_chunked(b"5\r\nhello\r\n0\r\n\r\n"));
        assert!(looks_chunked(b"1a\nabc"));
        assert!(looks_chunked(b"4;name=value\r\ntest\r\n0\r\n\r\n"));
        assert!(!looks_chunked(b"event: ping\r\ndata: 1\r\n\r\n"));
        assert!(!looks_chunked(b"data: 1\r\n"));
        assert!(!looks_chunked(b"5 \r\nhello"));
        assert!(!looks_chunked(b"abc"));
        assert!(!looks_chunked(b""));
    }

    #[test]
    fn test_decode_multiple_chunks() {
        let body = b"7\r\nevent: \r\n5\r\nping\n\r\n0\r\n\r\n";
        assert_eq!(decode(body).as_ref(), b"event: ping\n");
    }

    #[test]
    fn test_plain_body_passes_through_unchanged() {
        let body = b"event: ping\r\ndata: 1\r\n\r\n";
        let decoded = decode(body);
        assert!(matches!(decoded, Cow::Borrowed(_)));
        assert_eq!(decoded.as_ref(), body);
        assert_eq!(decode(decoded.as_ref()).as_ref(), body);
    }

    #[test]
    fn test_truncated_final_chunk() {
        assert_eq!(decode(b"5\r\nhel").as_ref(), b"hel");
    }

    #[test]
    fn test_truncated_size_line() {
        assert_eq!(decode(b"3\r\nabc\r\n1").as_ref(), b"abc");
    }

    #[test]
    fn test_malformed_size_stops_decoding() {
        assert_eq!(decode(b"3\r\nabc\r\nzz\r\nmore\r\n0\r\n\r\n").as_ref(), b"abc");
        assert_eq!(
            decode(b"3\r\nabc\r\nFFFFFFFFFFFFFFFFFFFFFFFF\r\nx\r\n").as_ref(),
            b"abc"
        );
    }

    #[test]
    fn test_zero_chunk_ends_decoding_and_ignores_trailers() {
        let body = b"2\r\nok\r\n0\r\nX-Trailer: yes\r\n\r\n3\r\nbad\r\n";
        assert_eq!(decode(body).as_ref(), b"ok");
    }

    #[test]
    fn test_chunk_extensions_are_ignored() {
        let body = b"4;name=value\r\ntest\r\n2;x\r\nok\r\n0\r\n\r\n";
        assert_eq!(decode(body).as_ref(), b"testok");
    }

    #[test]
    fn test_bare_lf_framing() {
        assert_eq!(decode(b"3\nabc\n2\nde\n0\n\n").as_ref(), b"abcde");
    }

    #[test]
    fn test_uppercase_hex_sizes() {
        let payload = vec![b'z'; 0x1A];
        let mut body = b"1A\r\n".to_vec();
        body.extend_from_slice(&payload);
        body.extend_from_slice(b"\r\n0\r\n\r\n");
        assert_eq!(decode(&body).as_ref(), &payload[..]);
    }

    #[test]
    fn test_reassembles_encoded_payload() {
        let payload = b"event: endpoint\r\ndata: /messages/?session_id=42\r\n\r\n: keep-alive\r\n\r\n";
        for chunk_size in [1, 7, 16, payload.len()] {
            let body = encode_chunked(payload, chunk_size);
            assert_eq!(decode(&body).as_ref(), &payload[..], "chunk size {}", chunk_size);
        }
    }
}
