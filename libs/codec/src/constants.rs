//! Wire protocol constants
//!
//! These values define the framing layout shared by both ends of a bridge
//! channel. Changing any of them breaks compatibility with deployed test
//! services.

/// Magic bytes at the start of every frame
pub const FRAME_MAGIC: [u8; 4] = *b"XDTB";

/// Current frame layout version
pub const FRAME_VERSION: u8 = 1;

/// magic (4) + version (1) + code (4) + body length (4)
pub const FRAME_HEADER_SIZE: usize = 13;

/// Trailing CRC32
pub const FRAME_CHECKSUM_SIZE: usize = 4;

/// Largest accepted frame body (16MB)
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Largest single string field inside an envelope (1MB)
pub const MAX_STRING_LENGTH: usize = 1024 * 1024;

/// Largest element count of an envelope array field
pub const MAX_ARRAY_LENGTH: usize = 4096;

/// `result` value reported for a successful call without a return value
pub const SUCCESS_SENTINEL: i64 = 1;

/// `result` value reported for any failed call
pub const FAILURE_SENTINEL: i64 = -1;
