//! Wire and protocol constants.
//!
//! These values define the on-the-wire format and MUST NOT change between
//! a sender and receiver that expect to interoperate.

// =============================================================================
// VALUE MARKERS (type-directed encoding)
// =============================================================================

/// Upper bound (inclusive) of the positive fixint range.
pub const MARKER_POS_FIXINT_MAX: u8 = 0x7f;

/// Fixmap prefix (low nibble = entry count).
pub const MARKER_FIXMAP: u8 = 0x80;

/// Fixarray prefix (low nibble = element count).
pub const MARKER_FIXARRAY: u8 = 0x90;

/// Fixstr prefix (low five bits = byte length).
pub const MARKER_FIXSTR: u8 = 0xa0;

/// The "empty/null" marker.
pub const MARKER_NIL: u8 = 0xc0;

/// Boolean false.
pub const MARKER_FALSE: u8 = 0xc2;

/// Boolean true.
pub const MARKER_TRUE: u8 = 0xc3;

/// Binary blob with 8-bit length.
pub const MARKER_BIN8: u8 = 0xc4;

/// Binary blob with 16-bit length.
pub const MARKER_BIN16: u8 = 0xc5;

/// Binary blob with 32-bit length.
pub const MARKER_BIN32: u8 = 0xc6;

/// 32-bit IEEE 754 float.
pub const MARKER_F32: u8 = 0xca;

/// 64-bit IEEE 754 float.
pub const MARKER_F64: u8 = 0xcb;

/// Unsigned 8-bit integer.
pub const MARKER_U8: u8 = 0xcc;

/// Unsigned 16-bit integer.
pub const MARKER_U16: u8 = 0xcd;

/// Unsigned 32-bit integer.
pub const MARKER_U32: u8 = 0xce;

/// Unsigned 64-bit integer.
pub const MARKER_U64: u8 = 0xcf;

/// Signed 8-bit integer.
pub const MARKER_I8: u8 = 0xd0;

/// Signed 16-bit integer.
pub const MARKER_I16: u8 = 0xd1;

/// Signed 32-bit integer.
pub const MARKER_I32: u8 = 0xd2;

/// Signed 64-bit integer.
pub const MARKER_I64: u8 = 0xd3;

/// String with 8-bit length.
pub const MARKER_STR8: u8 = 0xd9;

/// String with 16-bit length.
pub const MARKER_STR16: u8 = 0xda;

/// String with 32-bit length.
pub const MARKER_STR32: u8 = 0xdb;

/// Array with 16-bit element count.
pub const MARKER_ARRAY16: u8 = 0xdc;

/// Array with 32-bit element count.
pub const MARKER_ARRAY32: u8 = 0xdd;

/// Map with 16-bit entry count.
pub const MARKER_MAP16: u8 = 0xde;

/// Map with 32-bit entry count.
pub const MARKER_MAP32: u8 = 0xdf;

/// Lower bound (inclusive) of the negative fixint range.
pub const MARKER_NEG_FIXINT_MIN: u8 = 0xe0;

/// Maximum nesting depth accepted when skipping unknown values.
pub const MAX_SKIP_DEPTH: usize = 64;

// =============================================================================
// MESSAGE FRAME (compression wrapper)
// =============================================================================

/// Frame body is the raw type-directed encoding.
pub const FRAME_FLAG_RAW: u8 = 0x00;

/// Frame body is zstd-compressed.
pub const FRAME_FLAG_ZSTD: u8 = 0x01;

/// Frame header size (the flag byte).
pub const FRAME_HEADER_SIZE: usize = 1;

/// Number of elements in a packet root envelope (`[type, body]`).
pub const PACKET_ENVELOPE_LEN: usize = 2;

// =============================================================================
// COMPRESSION
// =============================================================================

/// Minimum size to attempt compression.
pub const MIN_COMPRESS_SIZE: usize = 64;

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Default upper bound on a decompressed payload (16 MiB).
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// SYNCHRONIZATION
// =============================================================================

/// Label of the session-level progress item.
pub const DEFAULT_PROGRESS_LABEL: &str = "syncing_world";
