//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the command key and the relay timer. It is driven
//! from exactly one place, the control loop, which feeds it drained
//! intake commands and periodic ticks. All I/O flows through port traits
//! injected at call sites, so the whole service runs against mocks.
//!
//! ```text
//!  IntakeQueue ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                  │       AppService        │
//!   RelayPort ◀────│  key · RelayTimer       │ ──▶ RenderQueue
//!                  └────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::DeviceConfig;
use crate::crypto::{self, DurationSecs, EncryptionKey};
use crate::error::{Error, LengthFault};
use crate::relay::{RelayState, RelayTimer, TickOutcome};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::intake::{INTAKE_DEPTH, IntakeQueue};
use super::ports::{ClockPort, EventSink, RelayPort};
use super::render::{RenderQueue, RenderRequest};

/// Grants longer than this are honoured but logged loudly.
pub const LONG_GRANT_SECS: DurationSecs = 24 * 60 * 60;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService<'q> {
    key: EncryptionKey,
    timer: RelayTimer,
    renders: &'q RenderQueue,
    accept_key_writes: bool,
}

impl<'q> AppService<'q> {
    /// Construct the service. Forces the relay off.
    ///
    /// Does **not** draw anything: call [`start`](Self::start) next.
    pub fn new(config: &DeviceConfig, renders: &'q RenderQueue, relay: &mut impl RelayPort) -> Self {
        Self {
            key: config.key(),
            timer: RelayTimer::new(relay),
            renders,
            accept_key_writes: config.accept_key_writes,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Queue the boot identity screen.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.renders.request(RenderRequest::Identity);
        sink.emit(&AppEvent::Started);
        info!("AppService started (key {})", self.key.fingerprint());
    }

    // ── Command handling ──────────────────────────────────────

    /// Process one drained write.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        relay: &mut impl RelayPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            AppCommand::Payload { data, len } => self.on_payload(&data, len, now_ms, relay, sink),
            AppCommand::ReplaceKey { data, len } => self.on_key_write(&data, len, sink),
        }
    }

    fn on_payload(
        &mut self,
        data: &[u8],
        len: usize,
        now_ms: u64,
        relay: &mut impl RelayPort,
        sink: &mut impl EventSink,
    ) {
        if len == 0 {
            warn!("Intake: empty command write ignored");
            sink.emit(&AppEvent::PayloadIgnored);
            return;
        }

        // `data` may be cut short of `len`; only the first block matters
        // for decryption, but the fault must reflect the real length.
        let out = crypto::decrypt_payload(data, &self.key);
        let fault = LengthFault::check(len, crypto::BLOCK_LEN);
        if let Some(f) = fault {
            warn!("Intake: {}", Error::MalformedPayload(f));
            sink.emit(&AppEvent::PayloadMalformed(f));
        }

        let secs = out.secs;
        if secs > LONG_GRANT_SECS {
            warn!("Intake: unusually long grant of {} s", secs);
        }

        let deadline_ms = self.timer.activate(secs, now_ms, relay);
        self.renders.request(RenderRequest::Countdown { secs });
        sink.emit(&AppEvent::RelayEngaged { secs, deadline_ms });
    }

    fn on_key_write(&mut self, data: &[u8], len: usize, sink: &mut impl EventSink) {
        if !self.accept_key_writes {
            warn!("Intake: key write refused (disabled)");
            sink.emit(&AppEvent::KeyRejected);
            return;
        }
        if len == 0 {
            warn!("Intake: empty key write refused");
            sink.emit(&AppEvent::KeyRejected);
            return;
        }

        let (key, _) = EncryptionKey::coerce(data);
        let fault = LengthFault::check(len, crypto::BLOCK_LEN);
        if let Some(f) = fault {
            warn!("Intake: {}", Error::InvalidKey(f));
        }
        self.key = key;
        sink.emit(&AppEvent::KeyReplaced {
            fingerprint: self.key.fingerprint(),
            fault,
        });
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Advance the relay timer. On expiry the identity screen is queued.
    pub fn tick(&mut self, now_ms: u64, relay: &mut impl RelayPort, sink: &mut impl EventSink) -> TickOutcome {
        let outcome = self.timer.tick(now_ms, relay);
        if outcome == TickOutcome::Expired {
            self.renders.request(RenderRequest::Identity);
            sink.emit(&AppEvent::RelayReleased { at_ms: now_ms });
        }
        outcome
    }

    /// One control-loop iteration: handle at most [`INTAKE_DEPTH`] pending
    /// writes, then tick. A steady stream of writes therefore cannot hold
    /// off a relay shutoff. Returns how many writes were handled.
    pub fn poll(
        &mut self,
        intake: &IntakeQueue,
        clock: &impl ClockPort,
        relay: &mut impl RelayPort,
        sink: &mut impl EventSink,
    ) -> usize {
        let handled = intake.drain(INTAKE_DEPTH, |msg| {
            self.handle_command(msg.into_command(), clock.now_ms(), relay, sink);
        });
        self.tick(clock.now_ms(), relay, sink);
        handled
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn relay_state(&self) -> RelayState {
        self.timer.state()
    }

    /// Whole seconds until the relay releases (zero when idle).
    pub fn remaining_secs(&self, now_ms: u64) -> u32 {
        self.timer.remaining_secs(now_ms)
    }

    /// Fingerprint of the key currently in use.
    pub fn key_fingerprint(&self) -> heapless::String<8> {
        self.key.fingerprint()
    }
}
