//! Unified error types for the RelayGate firmware.
//!
//! A single `Error` enum that every subsystem can convert into. All
//! variants are `Copy` so they can be handed to the event sink and the
//! logger without allocation.
//!
//! Note that the intake path never *returns* these for malformed
//! commands: a short or long payload is coerced to a full block and the
//! fault travels alongside the decrypted value (see
//! [`crypto::Decrypted`](crate::crypto::Decrypted)) so it stays
//! observable and testable.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A command write was not exactly one cipher block.
    MalformedPayload(LengthFault),
    /// A key write was not exactly 16 bytes.
    InvalidKey(LengthFault),
    /// The persistent key/value store failed.
    Storage(StorageError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPayload(e) => write!(f, "malformed payload: {e}"),
            Self::InvalidKey(e) => write!(f, "invalid key: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Length faults (payload and key)
// ---------------------------------------------------------------------------

/// How a byte string missed the 16-byte block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthFault {
    /// Fewer than 16 bytes; the tail was zero-padded.
    Short { len: usize },
    /// More than 16 bytes; everything past byte 16 was dropped.
    Long { len: usize },
}

impl LengthFault {
    /// Classify `len` against `expected`. `None` when it matches exactly.
    pub const fn check(len: usize, expected: usize) -> Option<Self> {
        if len < expected {
            Some(Self::Short { len })
        } else if len > expected {
            Some(Self::Long { len })
        } else {
            None
        }
    }
}

impl fmt::Display for LengthFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short { len } => write!(f, "{len} bytes, zero-padded to 16"),
            Self::Long { len } => write!(f, "{len} bytes, truncated to 16"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
