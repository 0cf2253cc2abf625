//! Length-prefixed message framing between client and server.
//!
//! Every frame is an 8-byte header (message kind and payload size, both
//! little-endian `u32`) followed by exactly `payload_size` bytes of payload.
//! A payload size of zero is legal; READY, GAME_OVER and the three control
//! messages are header-only.
//!
//! Typed payloads are encoded with bincode, which uses fixed-width
//! little-endian integers, so the format does not depend on the byte order or
//! struct padding of the producing host. An INPUT payload is exactly the four
//! bytes of one [`Direction`] tag; any other declared size is a protocol
//! error. Unknown kinds decode to `None` so a receiver can drop them and keep
//! reading.

use std::error::Error;
use std::fmt;

use crate::{Direction, Snapshot};

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Upper bound on a declared payload size. Bounds the allocation a corrupt
/// or hostile header can cause before any payload bytes are read.
pub const MAX_PAYLOAD_SIZE: u32 = 1 << 20;

/// Client -> server: one `Direction` value (4 bytes).
pub const MSG_INPUT: u32 = 0;
/// Client -> server: player paused, header-only.
pub const MSG_PAUSE: u32 = 1;
/// Client -> server: player wants to resume, header-only.
pub const MSG_RESUME: u32 = 2;
/// Client -> server: player is leaving, header-only.
pub const MSG_LEAVE: u32 = 3;
/// Server -> client: game is ready, header-only.
pub const MSG_READY: u32 = 4;
/// Server -> client: game over for this player, header-only.
pub const MSG_GAME_OVER: u32 = 5;
/// Server -> client: a [`Snapshot`] of the world.
pub const MSG_STATE: u32 = 6;
/// Server -> client: seconds remaining (one `i32`).
pub const MSG_TIME: u32 = 7;
/// Server -> client: UTF-8 error text.
pub const MSG_ERROR: u32 = 8;

/// Errors produced while encoding or decoding frames.
#[derive(Debug)]
pub enum ProtocolError {
    /// A fixed-size payload arrived with the wrong declared size.
    PayloadSize { kind: u32, size: usize },
    /// The header declared a payload larger than [`MAX_PAYLOAD_SIZE`].
    Oversized { declared: u32 },
    /// The payload bytes did not decode as the type the kind implies.
    Codec(bincode::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::PayloadSize { kind, size } => {
                write!(f, "invalid payload size {} for message kind {}", size, kind)
            }
            ProtocolError::Oversized { declared } => {
                write!(f, "declared payload size {} exceeds limit", declared)
            }
            ProtocolError::Codec(e) => write!(f, "payload codec error: {}", e),
        }
    }
}

impl Error for ProtocolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProtocolError::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<bincode::Error> for ProtocolError {
    fn from(e: bincode::Error) -> Self {
        ProtocolError::Codec(e)
    }
}

/// A complete protocol message, either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Input(Direction),
    Pause,
    Resume,
    Leave,
    Ready,
    GameOver,
    State(Snapshot),
    Time(i32),
    Error(String),
}

impl Message {
    /// The wire tag of this message.
    pub fn kind(&self) -> u32 {
        match self {
            Message::Input(_) => MSG_INPUT,
            Message::Pause => MSG_PAUSE,
            Message::Resume => MSG_RESUME,
            Message::Leave => MSG_LEAVE,
            Message::Ready => MSG_READY,
            Message::GameOver => MSG_GAME_OVER,
            Message::State(_) => MSG_STATE,
            Message::Time(_) => MSG_TIME,
            Message::Error(_) => MSG_ERROR,
        }
    }

    fn payload(&self) -> Result<Vec<u8>, ProtocolError> {
        let bytes = match self {
            Message::Input(direction) => bincode::serialize(direction)?,
            Message::State(snapshot) => bincode::serialize(snapshot)?,
            Message::Time(seconds) => bincode::serialize(seconds)?,
            Message::Error(text) => bincode::serialize(text)?,
            Message::Pause
            | Message::Resume
            | Message::Leave
            | Message::Ready
            | Message::GameOver => Vec::new(),
        };
        Ok(bytes)
    }

    /// Encodes the complete frame: header plus payload.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let payload = self.payload()?;
        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&encode_header(self.kind(), payload.len() as u32));
        frame.extend_from_slice(&payload);
        Ok(frame)
    }

    /// Decodes the payload of a frame whose header has already been read.
    ///
    /// Returns `Ok(None)` for unknown kinds; the caller is expected to drop
    /// those and continue. Fixed-size payloads are validated against their
    /// declared size before decoding.
    pub fn decode(kind: u32, payload: &[u8]) -> Result<Option<Message>, ProtocolError> {
        let message = match kind {
            MSG_INPUT => {
                if payload.len() != 4 {
                    return Err(ProtocolError::PayloadSize {
                        kind,
                        size: payload.len(),
                    });
                }
                Message::Input(bincode::deserialize(payload)?)
            }
            MSG_PAUSE => Message::Pause,
            MSG_RESUME => Message::Resume,
            MSG_LEAVE => Message::Leave,
            MSG_READY => Message::Ready,
            MSG_GAME_OVER => Message::GameOver,
            MSG_STATE => Message::State(bincode::deserialize(payload)?),
            MSG_TIME => {
                if payload.len() != 4 {
                    return Err(ProtocolError::PayloadSize {
                        kind,
                        size: payload.len(),
                    });
                }
                Message::Time(bincode::deserialize(payload)?)
            }
            MSG_ERROR => Message::Error(bincode::deserialize(payload)?),
            _ => return Ok(None),
        };
        Ok(Some(message))
    }
}

/// Builds the 8-byte frame header for a message kind and payload size.
pub fn encode_header(kind: u32, payload_size: u32) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[..4].copy_from_slice(&kind.to_le_bytes());
    header[4..].copy_from_slice(&payload_size.to_le_bytes());
    header
}

/// Parses a frame header into `(kind, payload_size)`.
///
/// Rejects sizes beyond [`MAX_PAYLOAD_SIZE`] so the reader never allocates a
/// buffer for a nonsensical declaration.
pub fn decode_header(header: &[u8; HEADER_SIZE]) -> Result<(u32, u32), ProtocolError> {
    let kind = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let payload_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if payload_size > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::Oversized {
            declared: payload_size,
        });
    }
    Ok((kind, payload_size))
}
