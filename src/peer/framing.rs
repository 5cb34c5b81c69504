//! Length-prefixed framing for stream transports.
//!
//! Each frame is a 4-byte big-endian length followed by that many bytes.
//! Zero-length frames and frames above the configured limit are refused in
//! both directions, so a corrupt prefix never drives a large allocation.

use crate::error::{Result, VoxbridgeError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the length prefix.
pub const HEADER_LEN: usize = 4;

fn check_len(len: usize, limit: usize) -> Result<()> {
    if len == 0 {
        return Err(VoxbridgeError::Transport {
            message: "zero-length frame".to_string(),
        });
    }
    if len > limit || u32::try_from(len).is_err() {
        return Err(VoxbridgeError::FrameTooLarge { size: len, limit });
    }
    Ok(())
}

/// Prefix `payload` with its length.
pub fn encode_frame(payload: &[u8], limit: usize) -> Result<Vec<u8>> {
    check_len(payload.len(), limit)?;
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8], limit: usize) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(payload, limit)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. `Ok(None)` means the peer closed cleanly between frames;
/// a stream ending inside a header or payload is a `Transport` error.
pub async fn read_frame<R>(reader: &mut R, limit: usize) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(VoxbridgeError::Transport {
                message: format!(
                    "Truncated frame header ({} of {} bytes)",
                    filled, HEADER_LEN
                ),
            });
        }
        filled += n;
    }
    let len = u32::from_be_bytes(header) as usize;
    check_len(len, limit)?;

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| VoxbridgeError::Transport {
            message: format!("Truncated frame ({} bytes expected): {}", len, e),
        })?;
    Ok(Some(payload))
}
