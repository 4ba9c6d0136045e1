//! Fuzz target: BLE write intake
//!
//! Splits the input into a sequence of writes on both characteristics,
//! pushes them through the intake queue into the service with a moving
//! clock, and asserts that nothing panics and the relay output always
//! matches the timer state.
//!
//! cargo fuzz run fuzz_intake

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaygate::app::events::AppEvent;
use relaygate::app::intake::{IntakeQueue, WriteKind};
use relaygate::app::ports::{ClockPort, EventSink, RelayPort};
use relaygate::app::render::RenderQueue;
use relaygate::app::service::AppService;
use relaygate::config::DeviceConfig;
use relaygate::relay::RelayState;

struct Pin(bool);

impl RelayPort for Pin {
    fn set_energised(&mut self, on: bool) {
        self.0 = on;
    }
    fn is_energised(&self) -> bool {
        self.0
    }
}

struct Clock(u64);

impl ClockPort for Clock {
    fn now_ms(&self) -> u64 {
        self.0
    }
}

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _event: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let cfg = DeviceConfig::default();
    let intake = IntakeQueue::new();
    let renders = RenderQueue::new();
    let mut pin = Pin(true);
    let mut clock = Clock(0);
    let mut app = AppService::new(&cfg, &renders, &mut pin);
    assert!(!pin.0, "relay must be off after construction");

    // Each record: [header][len][bytes...]. Header bit 0 picks the
    // characteristic, the rest advances the clock.
    let mut rest = data;
    while let [header, len, tail @ ..] = rest {
        let n = (*len as usize).min(tail.len());
        let (write, next) = tail.split_at(n);
        let kind = if header & 1 == 0 { WriteKind::Command } else { WriteKind::Key };
        intake.submit(kind, write);
        clock.0 = clock.0.saturating_add(u64::from(header >> 1) * 250);

        app.poll(&intake, &clock, &mut pin, &mut Discard);
        while renders.try_next().is_some() {}

        assert_eq!(pin.0, app.relay_state() != RelayState::Idle);
        rest = next;
    }
});
