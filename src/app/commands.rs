//! Inbound commands to the application service.
//!
//! Produced by draining the [`IntakeQueue`](super::intake::IntakeQueue);
//! the [`AppService`](super::service::AppService) interprets them.

use heapless::Vec;

use super::intake::MAX_WRITE_LEN;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Encrypted duration command. `len` is the size of the original
    /// write; `data` holds at most its first [`MAX_WRITE_LEN`] bytes.
    Payload { data: Vec<u8, MAX_WRITE_LEN>, len: usize },

    /// Replace the command key for the rest of this boot.
    ReplaceKey { data: Vec<u8, MAX_WRITE_LEN>, len: usize },
}
