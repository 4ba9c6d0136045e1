//! Identity presenter: the display task.
//!
//! Stateless apart from the device identity. It never decides *when* to
//! draw: the service enqueues [`RenderRequest::Identity`] at boot and on
//! every Active→Idle transition, and [`RenderRequest::Countdown`] on
//! every activation. This task just turns requests into display calls.

use log::debug;

use super::ports::DisplayPort;
use super::render::{RenderQueue, RenderRequest};
use crate::config::DeviceIdentity;

pub struct IdentityPresenter {
    identity: DeviceIdentity,
}

impl IdentityPresenter {
    pub fn new(identity: DeviceIdentity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &str {
        self.identity.as_str()
    }

    /// Perform one render.
    pub fn render(&self, req: RenderRequest, display: &mut impl DisplayPort) {
        debug!("Presenter: {:?}", req);
        match req {
            RenderRequest::Identity => display.show_identity(self.identity.as_str()),
            RenderRequest::Countdown { secs } => display.show_countdown(secs),
        }
    }

    /// Render everything currently queued. Returns how many requests
    /// were handled.
    pub fn drain(&self, queue: &RenderQueue, display: &mut impl DisplayPort) -> usize {
        let mut n = 0;
        while let Some(req) = queue.try_next() {
            self.render(req, display);
            n += 1;
        }
        n
    }

    /// Display task body: wait for requests forever.
    pub async fn run(&self, queue: &RenderQueue, display: &mut impl DisplayPort) {
        loop {
            let req = queue.next().await;
            self.render(req, display);
        }
    }
}
