//! Minimal HTTP/1.x response parsing over raw bytes.
//!
//! Only what endpoint detection needs: the status code, a lowercase header map
//! and the undecoded body. Anything unexpected degrades (status 0, no body)
//! instead of failing.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref STATUS_LINE: Regex =
        Regex::new(r"^HTTP/\S+ (\d{3})(?:\s|$)").expect("status line pattern is valid");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse<'a> {
    /// 0 when the first line is not an HTTP status line.
    pub status: u16,
    /// Keys are lowercase; a repeated header keeps its last value.
    pub headers: HashMap<String, String>,
    /// Everything after the header/body separator, `None` if there is no separator.
    pub body: Option<&'a [u8]>,
}

impl<'a> ParsedResponse<'a> {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

pub fn parse_response(raw: &[u8]) -> ParsedResponse<'_> {
    let (head, body) = match split_head_body(raw) {
        Some((head, body)) => (head, Some(body)),
        None => (raw, None),
    };

    let status = match raw.iter().position(|&b| b == b'\n') {
        Some(end) => parse_status_line(&String::from_utf8_lossy(&raw[..end])),
        None => 0,
    };

    let head = String::from_utf8_lossy(head);
    let mut headers = HashMap::new();
    for line in head.split('\n').skip(1) {
        if let Some((name, value)) = parse_header_line(strip_cr(line)) {
            headers.insert(name, value);
        }
    }

    ParsedResponse { status, headers, body }
}

/// `HTTP/<version> <3-digit code> ...` -> code, anything else -> 0.
pub fn parse_status_line(line: &str) -> u16 {
    STATUS_LINE
        .captures(strip_cr(line))
        .and_then(|caps| caps.get(1))
        .and_then(|code| code.as_str().parse().ok())
        .unwrap_or(0)
}

/// `Name: value` -> (`name`, `value`).
pub fn parse_header_line(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name.to_ascii_lowercase(), value.trim().to_string()))
}

/// Split at the first blank line. Accepts `\r\n\r\n` as well as bare `\n\n`,
/// whichever comes first. The separator belongs to neither half.
pub fn split_head_body(raw: &[u8]) -> Option<(&[u8], &[u8])> {
    let crlf = find(raw, b"\r\n\r\n").map(|pos| (pos, pos + 4));
    let lf = find(raw, b"\n\n").map(|pos| (pos, pos + 2));

    let (head_end, body_start) = match (crlf, lf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };

    Some((&raw[..head_end], &raw[body_start..]))
}

pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}
