//! Wireless write intake.
//!
//! The BLE stack delivers characteristic writes on its own task. That
//! task must not touch relay state or block, so it only copies the bytes
//! into an [`IntakeMsg`] and `try_send`s it here. The control loop
//! drains the queue one message at a time, which keeps the relay timer
//! single-writer without interrupt-safe locking.
//!
//! ```text
//!  ┌──────────────┐  IntakeMsg   ┌──────────────┐
//!  │  BLE task    │────────────▶│ Control loop  │──▶ AppService::handle_command
//!  │  (callback)  │ try_send     │ try_next      │
//!  └──────────────┘              └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use log::warn;

use super::commands::AppCommand;

/// Queue depth for pending writes.
pub const INTAKE_DEPTH: usize = 8;

/// Bytes kept per write. A command is one 16-byte block; anything past
/// this is dropped here, and the original length is kept so the
/// oversize write is still reported.
pub const MAX_WRITE_LEN: usize = 32;

/// Which characteristic the write arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// Encrypted duration command.
    Command,
    /// Legacy raw key replacement.
    Key,
}

/// One captured write.
#[derive(Debug, Clone)]
pub struct IntakeMsg {
    pub kind: WriteKind,
    /// Leading bytes of the write, at most [`MAX_WRITE_LEN`].
    pub data: Vec<u8, MAX_WRITE_LEN>,
    /// Length of the write as received.
    pub len: usize,
}

impl IntakeMsg {
    pub fn capture(kind: WriteKind, raw: &[u8]) -> Self {
        let keep = raw.len().min(MAX_WRITE_LEN);
        let mut data = Vec::new();
        // Cannot fail: `keep` never exceeds the capacity.
        let _ = data.extend_from_slice(&raw[..keep]);
        Self {
            kind,
            data,
            len: raw.len(),
        }
    }

    /// Convert into the command the application service understands.
    pub fn into_command(self) -> AppCommand {
        match self.kind {
            WriteKind::Command => AppCommand::Payload {
                data: self.data,
                len: self.len,
            },
            WriteKind::Key => AppCommand::ReplaceKey {
                data: self.data,
                len: self.len,
            },
        }
    }
}

/// Bounded intake queue shared between the BLE task and the control loop.
pub struct IntakeQueue {
    channel: Channel<CriticalSectionRawMutex, IntakeMsg, INTAKE_DEPTH>,
}

impl IntakeQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Capture a write and enqueue it. Non-blocking; safe from the BLE
    /// callback context. Returns `false` if the write was dropped.
    pub fn submit(&self, kind: WriteKind, raw: &[u8]) -> bool {
        let msg = IntakeMsg::capture(kind, raw);
        if self.channel.try_send(msg).is_err() {
            warn!("Intake: queue full, dropping {:?} write ({} bytes)", kind, raw.len());
            return false;
        }
        true
    }

    /// Next pending write, if any (control loop side).
    pub fn try_next(&self) -> Option<IntakeMsg> {
        self.channel.try_receive().ok()
    }

    /// Hand up to `limit` pending writes to `handler`, FIFO. Writes that
    /// arrive while draining count against the same limit.
    pub fn drain(&self, limit: usize, mut handler: impl FnMut(IntakeMsg)) -> usize {
        let mut n = 0;
        while n < limit {
            let Some(msg) = self.try_next() else { break };
            handler(msg);
            n += 1;
        }
        n
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl Default for IntakeQueue {
    fn default() -> Self {
        Self::new()
    }
}
