//! Wire protocol: framed JSON requests and responses.
//!
//! A frame is a 4-byte big-endian length prefix followed by that many
//! bytes of UTF-8 JSON. Requests are decoded into a closed [`Request`]
//! enum exactly once, here at the transport boundary; the dispatcher
//! never sees raw command strings.

use crate::element::ElementRecord;
use crate::errors::AutomationError;
use crate::input::ScrollDirection;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum frame payload: 1 MiB. A declared length beyond this is a
/// protocol violation and aborts the connection.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

const LEN_PREFIX: usize = 4;

/// Decoded request with validated parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Scan,
    Click { id: String },
    Scroll { direction: ScrollDirection, amount: i32 },
    Ping,
    /// Syntactically valid request whose command we do not know. Kept as
    /// a variant so the dispatcher owns the error response for it.
    Unknown(String),
}

#[derive(Debug, Deserialize)]
struct WireRequest {
    command: String,
    #[serde(default)]
    params: serde_json::Value,
}

impl Request {
    /// Decode one frame payload into a request.
    pub fn decode(payload: &[u8]) -> Result<Self, AutomationError> {
        let wire: WireRequest = serde_json::from_slice(payload)
            .map_err(|e| AutomationError::InvalidRequest(format!("malformed request: {e}")))?;
        match wire.command.as_str() {
            "SCAN" => Ok(Request::Scan),
            "PING" => Ok(Request::Ping),
            "CLICK" => {
                let id = match wire.params.get("id") {
                    Some(serde_json::Value::String(id)) => id.clone(),
                    // Numeric ids are tolerated and matched by their
                    // string form.
                    Some(serde_json::Value::Number(n)) => n.to_string(),
                    _ => {
                        return Err(AutomationError::InvalidRequest(
                            "missing 'id' parameter".to_string(),
                        ));
                    }
                };
                Ok(Request::Click { id })
            }
            "SCROLL" => {
                let direction = match wire.params.get("direction") {
                    None | Some(serde_json::Value::Null) => ScrollDirection::Down,
                    Some(value) => serde_json::from_value(value.clone()).map_err(|_| {
                        AutomationError::InvalidRequest(format!(
                            "invalid 'direction' parameter: {value}"
                        ))
                    })?,
                };
                let amount = match wire.params.get("amount") {
                    None | Some(serde_json::Value::Null) => 1,
                    Some(value) => value.as_i64().and_then(|n| i32::try_from(n).ok()).ok_or_else(
                        || {
                            AutomationError::InvalidRequest(format!(
                                "invalid 'amount' parameter: {value}"
                            ))
                        },
                    )?,
                };
                if amount < 1 {
                    return Err(AutomationError::InvalidRequest(
                        "'amount' must be positive".to_string(),
                    ));
                }
                Ok(Request::Scroll { direction, amount })
            }
            other => Ok(Request::Unknown(other.to_string())),
        }
    }
}

/// Response payload. `status` is the serde tag, so `Pong` serializes as
/// `{"status":"pong"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elements: Option<Vec<ElementRecord>>,
    },
    Error {
        message: String,
    },
    Pong,
}

impl Response {
    pub fn success() -> Self {
        Response::Success { elements: None }
    }

    pub fn elements(elements: Vec<ElementRecord>) -> Self {
        Response::Success {
            elements: Some(elements),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }
}

/// Prefix `payload` with its big-endian length.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, AutomationError> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(AutomationError::Protocol(format!(
            "frame length {} exceeds the {} byte limit",
            payload.len(),
            MAX_FRAME_LEN
        )));
    }
    let mut frame = Vec::with_capacity(LEN_PREFIX + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Read one frame. Returns `None` on end-of-stream before a full length
/// prefix (the peer closed cleanly); any other short read is an error.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>, AutomationError> {
    let mut prefix = [0u8; LEN_PREFIX];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(AutomationError::Protocol(format!(
            "declared frame length {len} exceeds the {MAX_FRAME_LEN} byte limit"
        )));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Write one frame and flush it.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), AutomationError> {
    let frame = encode_frame(payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
