//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (relay output, display, clock, event sinks, storage)
//! implement these traits. The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → actuator)
// ───────────────────────────────────────────────────────────────

/// The single binary output that gates the door strike / load.
///
/// Only [`RelayTimer`](crate::relay::RelayTimer) calls this.
pub trait RelayPort {
    /// Drive the output: `true` = relay energised.
    fn set_energised(&mut self, on: bool);

    /// Last level written.
    fn is_energised(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Display port (driven adapter: render task → screen)
// ───────────────────────────────────────────────────────────────

/// Screen collaborator. Both calls are fire-and-forget and may be slow
/// (e-ink refresh), which is why only the render task calls them.
pub trait DisplayPort {
    /// Draw `identity` as a scannable code.
    fn show_identity(&mut self, identity: &str);

    /// Draw the remaining-seconds countdown.
    fn show_countdown(&mut self, secs: u32);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock. Must never go backward.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// Values are opaque byte strings; writes MUST be atomic (NVS commits
/// are). Keys are namespaced so subsystems cannot collide.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Flash could not be initialised at all.
    Unavailable,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Unavailable => write!(f, "storage unavailable"),
        }
    }
}
