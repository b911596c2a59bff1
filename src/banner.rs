//! Banner grabbing on freshly opened TCP connections.
//!
//! Reads whatever the service volunteers right after the handshake. Ports that
//! conventionally speak HTTP get a `HEAD` request first since those servers
//! stay silent until the client talks.

use crate::services::is_http_port;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Bytes read from the socket at most.
const MAX_BANNER_SIZE: usize = 512;

/// Characters kept after sanitizing.
const MAX_BANNER_CHARS: usize = 160;

const HTTP_PROBE: &[u8] = b"HEAD / HTTP/1.0\r\n\r\n";

/// Try to read a banner from `stream`, waiting at most `wait` for each read.
pub async fn grab_banner(stream: &mut TcpStream, port: u16, wait: Duration) -> Option<String> {
    let mut buffer = [0u8; MAX_BANNER_SIZE];

    if is_http_port(port) {
        stream.write_all(HTTP_PROBE).await.ok()?;
    }

    match timeout(wait, stream.read(&mut buffer)).await {
        Ok(Ok(n)) if n > 0 => Some(sanitize_banner(&buffer[..n])).filter(|b| !b.is_empty()),
        _ => None,
    }
}

/// Replace control bytes, collapse whitespace and cap the length.
fn sanitize_banner(data: &[u8]) -> String {
    let mapped = data.iter().map(|&b| match b {
        b'\r' | b'\n' | b'\t' | b' ' => ' ',
        b if b.is_ascii_graphic() => b as char,
        _ => '.',
    });

    let mut out = String::with_capacity(data.len());
    for c in mapped {
        if c == ' ' && (out.is_empty() || out.ends_with(' ')) {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_end();
    trimmed.chars().take(MAX_BANNER_CHARS).collect()
}
