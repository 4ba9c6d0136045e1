//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them (serial log, BLE notify, ...).

use crate::error::LengthFault;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The service has started; the relay is off.
    Started,

    /// A command engaged (or re-armed) the relay.
    RelayEngaged { secs: u32, deadline_ms: u64 },

    /// The deadline passed and the relay was switched off.
    RelayReleased { at_ms: u64 },

    /// An empty command write was ignored.
    PayloadIgnored,

    /// A command write was padded or truncated to one block before decryption.
    PayloadMalformed(LengthFault),

    /// The command key was replaced. Carries the new key's fingerprint.
    KeyReplaced {
        fingerprint: heapless::String<8>,
        fault: Option<LengthFault>,
    },

    /// A key write arrived while key replacement is disabled, or was empty.
    KeyRejected,
}
