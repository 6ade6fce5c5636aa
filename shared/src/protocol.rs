//! Wire messages and their length-prefixed framing.
//!
//! Every frame is a big-endian `u32` payload length followed by the bincode
//! encoding of one [`Packet`].

use crate::error::ProtocolError;
use crate::geometry::Direction;
use crate::snake::SnakeId;
use crate::sync::{Snapshot, TurnDiff};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_FRAME_LEN: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    // participant -> server
    Join,
    SetProfile {
        display_name: String,
    },
    RequestMove {
        direction: Direction,
    },
    Leave,

    // server -> participant
    Setup {
        snapshot: Snapshot,
    },
    Joined {
        snake_id: SnakeId,
    },
    Update {
        turn: u32,
        diff: TurnDiff,
    },
    SnakeRemoved {
        snake_id: SnakeId,
    },
    Roster {
        players: Vec<RosterEntry>,
    },
    Disconnected {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub snake_id: SnakeId,
    pub name: String,
    pub length: usize,
    pub is_bot: bool,
}

/// Serializes a packet into a complete frame, prefix included.
pub fn encode_frame(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let payload = bincode::serialize(packet)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

pub fn decode_packet(payload: &[u8]) -> Result<Packet, ProtocolError> {
    Ok(bincode::deserialize(payload)?)
}

/// Reads one frame's payload. Returns `Ok(None)` on a clean end of stream
/// before the length prefix.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(packet)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
