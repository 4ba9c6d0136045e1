//! Render requests from the core to the display task.
//!
//! The core never draws. It enqueues a [`RenderRequest`] and returns;
//! the presenter task (see [`presenter`](super::presenter)) awaits the
//! queue and does the slow e-ink refresh on its own thread, so a
//! redraw can never delay a relay shutoff.
//!
//! Only the newest screen matters. When the display task has fallen so
//! far behind that the queue is full, the stale backlog is discarded and
//! the new request is queued, so the last request always reaches the
//! panel and an Idle entry can never lose its identity render.
//!
//! ```text
//!  Control loop ──try_send──▶ RenderQueue ──receive().await──▶ Presenter task
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::warn;

/// Queue depth. One countdown plus one identity per relay cycle fits
/// several cycles of backlog.
pub const RENDER_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderRequest {
    /// Show the device identity QR code (relay idle).
    Identity,
    /// Show the on-time countdown (relay just engaged).
    Countdown { secs: u32 },
}

/// Bounded MPMC render queue. `const`-constructible so the binary can
/// keep one in a `static`.
pub struct RenderQueue {
    channel: Channel<CriticalSectionRawMutex, RenderRequest, RENDER_DEPTH>,
}

impl RenderQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Enqueue without blocking. If the queue is full the pending
    /// backlog is superseded by `req`. Returns how many stale requests
    /// were discarded.
    pub fn request(&self, req: RenderRequest) -> usize {
        let Err(TrySendError::Full(req)) = self.channel.try_send(req) else {
            return 0;
        };

        let mut superseded = 0;
        while self.channel.try_receive().is_ok() {
            superseded += 1;
        }
        warn!("Render: display behind, {} stale request(s) superseded by {:?}", superseded, req);
        if self.channel.try_send(req).is_err() {
            warn!("Render: queue still full, dropping {:?}", req);
        }
        superseded
    }

    /// Wait for the next request.
    pub async fn next(&self) -> RenderRequest {
        self.channel.receive().await
    }

    pub fn try_next(&self) -> Option<RenderRequest> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}
