//! Transport frame
//!
//! A frame is the raw message the transport moves: a request or reply code
//! plus an opaque body (an encoded [`Envelope`](crate::Envelope) for `INVOKE`).
//!
//! ```text
//! ┌───────────┬─────────┬──────────┬──────────────┬──────────┬─────────┐
//! │ magic (4) │ ver (1) │ code (4) │ body_len (4) │ body (N) │ crc (4) │
//! └───────────┴─────────┴──────────┴──────────────┴──────────┴─────────┘
//! ```
//!
//! Integers are little-endian. The CRC32 covers every byte before it.
//! Unknown codes decode successfully so the stub can answer them with an
//! explicit unsupported reply.

use crate::constants::{
    FRAME_CHECKSUM_SIZE, FRAME_HEADER_SIZE, FRAME_MAGIC, FRAME_VERSION, MAX_BODY_SIZE,
};
use crate::error::{DecodeError, EncodeError};
use crate::wire::WireReader;
use byteorder::{LittleEndian, WriteBytesExt};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Codes a client may send
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum RequestCode {
    Invoke = 1,
}

/// Codes a stub may answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum ReplyCode {
    /// Normal reply carrying the reply envelope
    Invoke = 1,
    /// Request code not recognized, empty body
    Unsupported = 0xFFFF_FFFF,
}

/// Code-tagged raw transport message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub code: u32,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(code: u32, body: Vec<u8>) -> Self {
        Self { code, body }
    }

    pub fn invoke(body: Vec<u8>) -> Self {
        Self::new(RequestCode::Invoke.into(), body)
    }

    pub fn unsupported() -> Self {
        Self::new(ReplyCode::Unsupported.into(), Vec::new())
    }

    /// Interpret the code as a request code
    pub fn request_code(&self) -> Option<RequestCode> {
        RequestCode::try_from(self.code).ok()
    }

    /// Interpret the code as a reply code
    pub fn reply_code(&self) -> Option<ReplyCode> {
        ReplyCode::try_from(self.code).ok()
    }

    /// Fail when the body is over `MAX_BODY_SIZE`
    pub fn check_size(&self) -> Result<(), EncodeError> {
        if self.body.len() > MAX_BODY_SIZE {
            return Err(EncodeError::BodyTooLarge {
                size: self.body.len(),
                max: MAX_BODY_SIZE,
            });
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        self.check_size()?;

        let mut buffer =
            Vec::with_capacity(FRAME_HEADER_SIZE + self.body.len() + FRAME_CHECKSUM_SIZE);
        buffer.extend_from_slice(&FRAME_MAGIC);
        buffer.push(FRAME_VERSION);
        buffer.extend_from_slice(&self.code.to_le_bytes());
        buffer.extend_from_slice(&(self.body.len() as u32).to_le_bytes());
        buffer.extend_from_slice(&self.body);

        let checksum = crc32fast::hash(&buffer);
        buffer
            .write_u32::<LittleEndian>(checksum)
            .map_err(|e| EncodeError::ResultSerialization {
                reason: format!("frame write failed: {}", e),
            })?;
        Ok(buffer)
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < FRAME_HEADER_SIZE + FRAME_CHECKSUM_SIZE {
            return Err(DecodeError::truncated(
                "frame header",
                0,
                FRAME_HEADER_SIZE + FRAME_CHECKSUM_SIZE,
                data.len(),
            ));
        }

        let mut reader = WireReader::new(data);

        let magic = reader.take(4, "magic")?;
        if magic != FRAME_MAGIC {
            let mut actual = [0u8; 4];
            actual.copy_from_slice(magic);
            return Err(DecodeError::InvalidMagic {
                expected: FRAME_MAGIC,
                actual,
            });
        }

        let version = reader.read_u8("version")?;
        if version != FRAME_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                version,
                supported: FRAME_VERSION,
            });
        }

        let code = reader.read_u32("code")?;
        let body_len = reader.read_u32("body length")? as usize;
        if body_len > MAX_BODY_SIZE {
            return Err(DecodeError::length_out_of_range("body", body_len, MAX_BODY_SIZE));
        }
        let body = reader.take(body_len, "body")?.to_vec();

        let checked_len = reader.position();
        let expected = reader.read_u32("checksum")?;
        reader.finish("frame")?;

        let calculated = crc32fast::hash(&data[..checked_len]);
        if expected != calculated {
            return Err(DecodeError::ChecksumMismatch {
                expected,
                calculated,
                frame_size: data.len(),
            });
        }

        Ok(Self { code, body })
    }
}
