//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | relay=off"),
            AppEvent::RelayEngaged { secs, deadline_ms } => {
                info!("RELAY | on | secs={} | deadline={}ms", secs, deadline_ms);
            }
            AppEvent::RelayReleased { at_ms } => info!("RELAY | off | at={}ms", at_ms),
            AppEvent::PayloadIgnored => info!("INTAKE | empty write ignored"),
            AppEvent::PayloadMalformed(fault) => warn!("INTAKE | malformed | {}", fault),
            AppEvent::KeyReplaced { fingerprint, fault } => match fault {
                Some(f) => warn!("KEY | replaced | fp={} | {}", fingerprint, f),
                None => info!("KEY | replaced | fp={}", fingerprint),
            },
            AppEvent::KeyRejected => warn!("KEY | write rejected"),
        }
    }
}
