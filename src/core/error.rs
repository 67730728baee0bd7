//! Error types for worldsync.

use std::sync::Arc;

use thiserror::Error;

use crate::sync::UnitId;

/// Boxed error returned by a unit step function.
pub type UnitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A unit failure kept by an aborted session and handed out on every query.
pub type SharedUnitError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from the compression wrapper.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompressionError {
    /// Zstd compression failed.
    #[error("compression failed: {0}")]
    CompressionFailed(String),

    /// Zstd decompression failed.
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Decompressed size exceeds safety limit.
    #[error("decompressed size exceeded limit: {size} > {limit}")]
    SizeExceeded {
        /// Actual decompressed size.
        size: usize,
        /// Maximum allowed size.
        limit: usize,
    },

    /// A compressed frame arrived but compression support is not compiled in.
    #[error("compressed frame received but the `compression` feature is disabled")]
    Unsupported,
}

/// Malformed or incompatible bytes.
///
/// A decode either fully succeeds or the whole message is rejected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    /// Input ended before the value was complete.
    #[error("unexpected end of data")]
    UnexpectedEof,

    /// The next marker is not one the target type accepts.
    #[error("unexpected marker 0x{found:02x}, expected {expected}")]
    UnexpectedMarker {
        /// What the reader was looking for.
        expected: &'static str,
        /// The marker byte actually present.
        found: u8,
    },

    /// The null marker was found where a non-nullable structure was expected.
    #[error("null value for non-nullable type {type_name}")]
    NullValue {
        /// Target type.
        type_name: &'static str,
    },

    /// An integer does not fit the target width.
    #[error("integer out of range for {type_name}")]
    IntegerOutOfRange {
        /// Target type.
        type_name: &'static str,
    },

    /// A string value is not valid UTF-8.
    #[error("invalid utf-8 in string value")]
    InvalidUtf8,

    /// An enum name is not known to this build.
    #[error("unknown variant {name:?} for {type_name}")]
    UnknownVariant {
        /// Target enum type.
        type_name: &'static str,
        /// Name found on the wire.
        name: String,
    },

    /// A required structure field is absent.
    #[error("missing field #{index} of {type_name}")]
    MissingField {
        /// Structure type.
        type_name: &'static str,
        /// Zero-based field position.
        index: usize,
    },

    /// The packet envelope names a different packet type.
    #[error("packet type mismatch: expected {expected}, got {found}")]
    PacketMismatch {
        /// Expected packet type name.
        expected: &'static str,
        /// Packet type name on the wire.
        found: String,
    },

    /// Bytes remain after the root value.
    #[error("{0} trailing bytes after root value")]
    TrailingBytes(usize),

    /// Nested values exceed the skip depth limit.
    #[error("nesting depth exceeded limit of {0}")]
    DepthExceeded(usize),

    /// The frame header carries an unknown flag.
    #[error("unknown frame flag 0x{0:02x}")]
    UnknownFrameFlag(u8),

    /// The compression wrapper could not be removed.
    #[error("frame decompression failed: {0}")]
    Compression(#[from] CompressionError),
}

/// Errors from the packet codec.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// Malformed or incompatible bytes.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The type has no registered formatter and structural fallback is
    /// disabled for it.
    #[error("no formatter registered for {type_name}")]
    FormatterMissing {
        /// Type lacking a formatter.
        type_name: &'static str,
    },

    /// A second formatter was registered for a type that already has one.
    #[error("formatter already registered for {type_name}")]
    DuplicateFormatter {
        /// Type registered twice.
        type_name: &'static str,
    },

    /// The outbound frame could not be compressed.
    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),
}

impl CodecError {
    /// Build a `FormatterMissing` error for `T`.
    pub fn formatter_missing<T: ?Sized>() -> Self {
        CodecError::FormatterMissing {
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// Errors from the packet transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The receiving side of the channel is gone.
    #[error("transport channel closed")]
    ChannelClosed,
}

/// Session-fatal synchronization errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The snapshot (or an outbound packet) could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A full wave made no progress while units remain.
    #[error("dependency deadlock between: {}", join_ids(.pending))]
    DependencyDeadlock {
        /// Units that never became eligible, in registration order.
        pending: Vec<UnitId>,
    },

    /// A unit's step function failed; the session was aborted.
    #[error("unit {unit} failed: {source}")]
    UnitStepFailure {
        /// Failing unit.
        unit: UnitId,
        /// Error raised by the step.
        #[source]
        source: SharedUnitError,
    },

    /// A session is already running on this receiver.
    #[error("an initial sync session is already active")]
    SessionActive,

    /// The world is already marked ready.
    #[error("world already synchronized")]
    AlreadySynchronized,

    /// Two units were registered under the same identity.
    #[error("duplicate unit identity: {0}")]
    DuplicateUnit(UnitId),

    /// An outbound packet could not be sent.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Every unit ran and the world is marked ready, but the completion
    /// acknowledgement did not reach the transport.
    #[error("world ready but acknowledgement failed: {source}")]
    AcknowledgementFailed {
        /// Why the acknowledgement was not sent.
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// True for malformed-bytes failures.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, SyncError::Codec(CodecError::Decode(_)))
    }

    /// True when a required formatter was absent.
    pub fn is_formatter_missing(&self) -> bool {
        matches!(self, SyncError::Codec(CodecError::FormatterMissing { .. }))
    }

    /// True when the world was synchronized despite this error.
    ///
    /// Only a failed acknowledgement leaves the world ready; the host should
    /// resend it with `InitialSyncReceiver::acknowledge` rather than retry
    /// the sync.
    pub fn is_world_ready(&self) -> bool {
        matches!(self, SyncError::AcknowledgementFailed { .. })
    }

    /// Units still pending when the session stalled.
    pub fn pending_units(&self) -> Option<&[UnitId]> {
        match self {
            SyncError::DependencyDeadlock { pending } => Some(pending),
            _ => None,
        }
    }
}

fn join_ids(ids: &[UnitId]) -> String {
    ids.iter()
        .map(UnitId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
