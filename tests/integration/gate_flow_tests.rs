//! End-to-end command flow: BLE write → intake queue → AppService →
//! relay + render queue → presenter → display.

use relaygate::app::events::AppEvent;
use relaygate::app::intake::{IntakeQueue, WriteKind};
use relaygate::app::presenter::IdentityPresenter;
use relaygate::app::render::RenderQueue;
use relaygate::app::service::AppService;
use relaygate::config::{DEFAULT_KEY, DeviceConfig, DeviceIdentity};
use relaygate::crypto::{self, EncryptionKey};
use relaygate::error::LengthFault;
use relaygate::relay::RelayState;

use super::mock_hw::{LogSink, ManualClock, MockDisplay, MockRelay, Screen};

struct Rig {
    config: DeviceConfig,
    intake: IntakeQueue,
    renders: RenderQueue,
    clock: ManualClock,
    relay: MockRelay,
    display: MockDisplay,
    sink: LogSink,
}

impl Rig {
    fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            intake: IntakeQueue::new(),
            renders: RenderQueue::new(),
            clock: ManualClock::at(0),
            relay: MockRelay::new(),
            display: MockDisplay::default(),
            sink: LogSink::new(),
        }
    }

    fn presenter(&self) -> IdentityPresenter {
        IdentityPresenter::new(self.config.device_id.clone())
    }
}

fn config() -> DeviceConfig {
    DeviceConfig::with_identity(DeviceIdentity::try_from("GATE-TEST01").unwrap())
}

/// One control-loop iteration followed by a display-task drain.
macro_rules! step {
    ($rig:ident, $app:ident) => {{
        $app.poll(&$rig.intake, &$rig.clock, &mut $rig.relay, &mut $rig.sink);
        $rig.presenter().drain(&$rig.renders, &mut $rig.display);
    }};
}

#[test]
fn reference_scenario_ten_seconds() {
    let mut rig = Rig::new(config());
    let mut app = AppService::new(&rig.config, &rig.renders, &mut rig.relay);
    app.start(&mut rig.sink);

    // "MySecureKey12\0\0\0", 00 00 00 0A + 12 zero bytes.
    let key = EncryptionKey::new(DEFAULT_KEY);
    let mut plain = [0u8; 16];
    plain[3] = 0x0A;
    let block = crypto::encrypt_duration(10, &key);
    assert_eq!(crypto::decrypt_block(&block, &key), plain);

    rig.clock.set(42_000);
    rig.intake.submit(WriteKind::Command, block.as_bytes());
    step!(rig, app);

    assert!(rig.relay.is_energised_now());
    assert_eq!(app.relay_state(), RelayState::Active { end_ms: 52_000 });
    assert_eq!(
        rig.display.screens,
        [
            Screen::Identity("GATE-TEST01".into()),
            Screen::Countdown(10)
        ]
    );

    rig.clock.set(51_999);
    step!(rig, app);
    assert!(rig.relay.is_energised_now());

    rig.clock.set(52_000);
    step!(rig, app);
    assert!(!rig.relay.is_energised_now());
    assert_eq!(app.relay_state(), RelayState::Idle);
    assert_eq!(rig.display.identity_renders(), 2);
}

#[test]
fn one_identity_render_per_idle_entry() {
    let mut rig = Rig::new(config());
    let mut app = AppService::new(&rig.config, &rig.renders, &mut rig.relay);
    app.start(&mut rig.sink);
    step!(rig, app);

    for cycle in 0..3u64 {
        let block = crypto::encrypt_duration(1, &rig.config.key());
        rig.intake.submit(WriteKind::Command, block.as_bytes());
        step!(rig, app);
        // Plenty of idle ticks after expiry.
        for _ in 0..5 {
            rig.clock.advance(500);
            step!(rig, app);
        }
        assert_eq!(rig.display.identity_renders() as u64, 2 + cycle);
    }
    assert_eq!(rig.relay.engagements(), 3);
}

#[test]
fn rearm_extends_deadline() {
    let mut rig = Rig::new(config());
    let mut app = AppService::new(&rig.config, &rig.renders, &mut rig.relay);
    let key = rig.config.key();

    rig.intake
        .submit(WriteKind::Command, crypto::encrypt_duration(5, &key).as_bytes());
    step!(rig, app);
    rig.clock.set(1_000);
    rig.intake
        .submit(WriteKind::Command, crypto::encrypt_duration(20, &key).as_bytes());
    step!(rig, app);

    rig.clock.set(6_000);
    step!(rig, app);
    assert!(matches!(app.relay_state(), RelayState::Active { end_ms: 21_000 }));
    // Re-arm does not pass through Idle, so no identity render in between.
    assert_eq!(rig.display.identity_renders(), 0);
    assert_eq!(
        rig.sink
            .events
            .iter()
            .filter(|e| matches!(e, AppEvent::RelayReleased { .. }))
            .count(),
        0
    );
}

#[test]
fn empty_write_changes_nothing() {
    let mut rig = Rig::new(config());
    let mut app = AppService::new(&rig.config, &rig.renders, &mut rig.relay);
    let writes_before = rig.relay.writes.len();

    rig.intake.submit(WriteKind::Command, &[]);
    step!(rig, app);

    assert_eq!(app.relay_state(), RelayState::Idle);
    assert_eq!(rig.relay.writes.len(), writes_before);
    assert!(rig.display.screens.is_empty());
    assert_eq!(rig.sink.events, [AppEvent::PayloadIgnored]);
}

#[test]
fn short_write_is_padded_and_reported() {
    let mut rig = Rig::new(config());
    let mut app = AppService::new(&rig.config, &rig.renders, &mut rig.relay);

    rig.intake.submit(WriteKind::Command, b"abc");
    step!(rig, app);

    assert_eq!(
        rig.sink.events[0],
        AppEvent::PayloadMalformed(LengthFault::Short { len: 3 })
    );
    // Degrades to *some* duration rather than failing.
    assert!(matches!(rig.sink.events[1], AppEvent::RelayEngaged { .. }));
}

#[test]
fn replaced_key_takes_effect_for_next_command() {
    let mut rig = Rig::new(config());
    let mut app = AppService::new(&rig.config, &rig.renders, &mut rig.relay);
    let new_key = *b"fedcba9876543210";

    rig.intake.submit(WriteKind::Key, &new_key);
    rig.intake.submit(
        WriteKind::Command,
        crypto::encrypt_duration(7, &EncryptionKey::new(new_key)).as_bytes(),
    );
    step!(rig, app);

    assert_eq!(app.relay_state(), RelayState::Active { end_ms: 7_000 });
    assert_eq!(app.key_fingerprint(), EncryptionKey::new(new_key).fingerprint());
}

#[test]
fn key_writes_can_be_disabled() {
    let cfg = DeviceConfig {
        accept_key_writes: false,
        ..config()
    };
    let mut rig = Rig::new(cfg);
    let mut app = AppService::new(&rig.config, &rig.renders, &mut rig.relay);
    let before = app.key_fingerprint();

    rig.intake.submit(WriteKind::Key, b"attacker-key-000");
    step!(rig, app);

    assert_eq!(app.key_fingerprint(), before);
    assert_eq!(rig.sink.events, [AppEvent::KeyRejected]);
}

#[test]
fn burst_beyond_queue_depth_keeps_relay_consistent() {
    let mut rig = Rig::new(config());
    let mut app = AppService::new(&rig.config, &rig.renders, &mut rig.relay);
    let key = rig.config.key();

    let accepted = (1..=20u32)
        .filter(|s| {
            rig.intake
                .submit(WriteKind::Command, crypto::encrypt_duration(*s, &key).as_bytes())
        })
        .count();
    assert_eq!(accepted, relaygate::app::intake::INTAKE_DEPTH);

    step!(rig, app);
    // Last accepted command wins.
    assert_eq!(
        app.relay_state(),
        RelayState::Active {
            end_ms: accepted as u64 * 1000
        }
    );
    assert_eq!(rig.relay.is_energised_now(), app.relay_state() != RelayState::Idle);
}

#[test]
fn stalled_display_still_returns_to_identity() {
    let mut rig = Rig::new(config());
    let mut app = AppService::new(&rig.config, &rig.renders, &mut rig.relay);
    let zero = crypto::encrypt_duration(0, &rig.config.key());

    // Four grants land in one poll window while the panel is mid-refresh.
    for _ in 0..relaygate::app::render::RENDER_DEPTH {
        rig.intake.submit(WriteKind::Command, zero.as_bytes());
    }
    rig.clock.set(1_000);
    app.poll(&rig.intake, &rig.clock, &mut rig.relay, &mut rig.sink);
    assert_eq!(app.relay_state(), RelayState::Idle);

    // Panel catches up: whatever it draws, the last screen is the identity.
    rig.presenter().drain(&rig.renders, &mut rig.display);
    assert_eq!(
        rig.display.screens.last(),
        Some(&Screen::Identity("GATE-TEST01".into()))
    );
}
