//! HTTP/1.1 Upgrade handshake.
//!
//! The request is literal text with CRLF line endings. Success is decided
//! by a substring match on the status text, not by parsing headers.

use std::time::Duration;

use base64::prelude::*;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::connector::Endpoint;
use crate::error::{Result, WsError};

/// Status text that marks an accepted upgrade.
pub const SWITCHING_PROTOCOLS: &str = "101 Switching Protocols";

/// Upper bound on the handshake response read.
pub const MAX_RESPONSE_LEN: usize = 1024;

/// Protocol version announced in the request.
pub const WEBSOCKET_VERSION: &str = "13";

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Fresh `Sec-WebSocket-Key` nonce: base64 of 16 random bytes.
pub fn generate_key() -> String {
    let input: [u8; 16] = rand::random();
    BASE64_STANDARD.encode(input)
}

/// Build the Upgrade request for `endpoint`.
pub fn build_request(endpoint: &Endpoint, key: &str) -> String {
    format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: {version}\r\n\r\n",
        path = endpoint.path(),
        host = endpoint.host(),
        port = endpoint.port(),
        key = key,
        version = WEBSOCKET_VERSION,
    )
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Check a complete handshake response.
///
/// The header block must be terminated by an empty line. Returns the bytes
/// that followed it, which already belong to the frame stream.
pub fn check_response(response: &[u8]) -> Result<Bytes> {
    if find(response, SWITCHING_PROTOCOLS.as_bytes()).is_none() {
        let status_line = response
            .split(|&b| b == b'\n')
            .next()
            .map(|line| String::from_utf8_lossy(line).trim_end().to_string())
            .unwrap_or_default();
        return Err(WsError::HandshakeFailed(format!(
            "unexpected response: {:?}",
            status_line
        )));
    }

    let Some(pos) = find(response, HEADER_TERMINATOR) else {
        return Err(WsError::HandshakeFailed(
            "incomplete response headers".to_string(),
        ));
    };
    Ok(Bytes::copy_from_slice(
        &response[pos + HEADER_TERMINATOR.len()..],
    ))
}

/// Run the opening handshake on a freshly connected stream.
///
/// The request write and the whole response read are each bounded by
/// `timeout`. The response is read up to the end of its header block and
/// at most [`MAX_RESPONSE_LEN`] bytes.
pub async fn perform<S>(stream: &mut S, endpoint: &Endpoint, timeout: Duration) -> Result<Bytes>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = build_request(endpoint, &generate_key());

    let write = async {
        stream.write_all(request.as_bytes()).await?;
        stream.flush().await
    };
    match tokio::time::timeout(timeout, write).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(WsError::HandshakeFailed(format!("request write: {}", e))),
        Err(_) => return Err(WsError::HandshakeFailed("request write timed out".to_string())),
    }

    // Headers may arrive over several segments; stop at the empty line,
    // EOF, or the size limit.
    let read = async {
        let mut response = BytesMut::with_capacity(MAX_RESPONSE_LEN);
        let mut limited = (&mut *stream).take(MAX_RESPONSE_LEN as u64);
        while find(&response, HEADER_TERMINATOR).is_none() {
            if limited.read_buf(&mut response).await? == 0 {
                break;
            }
        }
        Ok::<_, std::io::Error>(response)
    };
    match tokio::time::timeout(timeout, read).await {
        Ok(Ok(response)) if response.is_empty() => Err(WsError::HandshakeFailed(
            "connection closed during handshake".to_string(),
        )),
        Ok(Ok(response)) => check_response(&response),
        Ok(Err(e)) => Err(WsError::HandshakeFailed(format!("response read: {}", e))),
        Err(_) => Err(WsError::HandshakeFailed("response timed out".to_string())),
    }
}
