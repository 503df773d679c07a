//! Content-Length framing shared by every DAP message.
//!
//! ```text
//! Content-Length: 119\r\n
//! \r\n
//! {"seq":153,"type":"request","command":"next",...}
//! ```

use std::io::Write as _;

use crate::error::DapError;

const HEADER_END: &[u8] = b"\r\n\r\n";

/// Frame a JSON message for the wire.
pub fn encode_message(value: &serde_json::Value) -> Vec<u8> {
    let body = value.to_string();
    let mut framed = Vec::with_capacity(body.len() + 32);
    // Writing into a Vec cannot fail.
    let _ = write!(framed, "Content-Length: {}\r\n\r\n{body}", body.len());
    framed
}

/// Take one framed message off the front of `data`.
///
/// `Ok(None)` means more bytes are needed. Otherwise returns the message
/// and how many bytes it occupied. Bad headers and bodies are errors.
pub fn decode_message(data: &[u8]) -> Result<Option<(serde_json::Value, usize)>, DapError> {
    let Some(header_len) = data
        .windows(HEADER_END.len())
        .position(|w| w == HEADER_END)
    else {
        return Ok(None);
    };

    let header = std::str::from_utf8(&data[..header_len])
        .map_err(|e| DapError::Transport(format!("header is not UTF-8: {e}")))?;
    let body_len = content_length(header)?;

    let body_start = header_len + HEADER_END.len();
    let end = body_start + body_len;
    let Some(body) = data.get(body_start..end) else {
        return Ok(None);
    };
    let value = serde_json::from_slice(body)
        .map_err(|e| DapError::InvalidResponse(format!("JSON parse error: {e}")))?;
    Ok(Some((value, end)))
}

/// Value of the `Content-Length` field. Other header fields are ignored.
fn content_length(header: &str) -> Result<usize, DapError> {
    let raw = header
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| value.trim())
        .ok_or_else(|| DapError::Transport("missing Content-Length header".into()))?;
    raw.parse()
        .map_err(|e| DapError::Transport(format!("invalid Content-Length value '{raw}': {e}")))
}
