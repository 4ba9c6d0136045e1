//! Boot sequence: config from storage, relay forced off, identity
//! screen, BLE writes reaching the control loop.

use relaygate::adapters::ble::BleAdapter;
use relaygate::adapters::device_id;
use relaygate::app::events::AppEvent;
use relaygate::app::intake::IntakeQueue;
use relaygate::app::presenter::IdentityPresenter;
use relaygate::app::render::RenderQueue;
use relaygate::app::service::AppService;
use relaygate::config::{DEFAULT_KEY, DeviceConfig, KEY_DEVICE_ID, KEY_ENC_KEY, NAMESPACE};
use relaygate::crypto;
use relaygate::relay::RelayState;

use super::mock_hw::{LogSink, ManualClock, MockDisplay, MockNvs, MockRelay, Screen};

fn mac_defaults() -> DeviceConfig {
    DeviceConfig::with_identity(device_id::device_id(&[0, 0, 0, 0x01, 0x02, 0x03]))
}

#[test]
fn first_boot_writes_defaults_to_storage() {
    let mut nvs = MockNvs::new();
    let cfg = DeviceConfig::load(&mut nvs, mac_defaults());

    assert_eq!(cfg.device_id.as_str(), "GATE-010203");
    assert_eq!(cfg.encryption_key, DEFAULT_KEY);
    assert_eq!(
        nvs.raw(NAMESPACE, KEY_DEVICE_ID).map(Vec::as_slice),
        Some(&b"GATE-010203"[..])
    );
    assert_eq!(
        nvs.raw(NAMESPACE, KEY_ENC_KEY).map(Vec::as_slice),
        Some(&DEFAULT_KEY[..])
    );
}

#[test]
fn second_boot_reads_back_provisioned_values() {
    let mut nvs = MockNvs::new();
    use relaygate::app::ports::StoragePort;
    nvs.write(NAMESPACE, KEY_DEVICE_ID, b"LOBBY-EAST").unwrap();
    nvs.write(NAMESPACE, KEY_ENC_KEY, b"0123456789ABCDEF").unwrap();

    let cfg = DeviceConfig::load(&mut nvs, mac_defaults());
    assert_eq!(cfg.device_id.as_str(), "LOBBY-EAST");
    assert_eq!(&cfg.encryption_key, b"0123456789ABCDEF");
}

#[test]
fn storage_failure_does_not_halt_boot() {
    let mut nvs = MockNvs::failing();
    let cfg = DeviceConfig::load(&mut nvs, mac_defaults());
    assert_eq!(cfg.device_id.as_str(), "GATE-010203");
    assert_eq!(cfg.encryption_key, DEFAULT_KEY);
}

#[test]
fn boot_forces_relay_off_and_shows_identity_once() {
    let cfg = mac_defaults();
    let renders = RenderQueue::new();
    let mut relay = MockRelay::new();
    let mut sink = LogSink::new();
    let mut display = MockDisplay::default();

    let mut app = AppService::new(&cfg, &renders, &mut relay);
    assert_eq!(relay.writes, [false]);

    app.start(&mut sink);
    assert_eq!(renders.len(), 1);

    let presenter = IdentityPresenter::new(cfg.device_id.clone());
    presenter.drain(&renders, &mut display);
    assert_eq!(display.screens, [Screen::Identity("GATE-010203".into())]);
    assert_eq!(sink.events, [AppEvent::Started]);
}

#[test]
fn ble_write_reaches_relay_through_queue() {
    let cfg = mac_defaults();
    let intake: &'static IntakeQueue = Box::leak(Box::new(IntakeQueue::new()));
    let renders = RenderQueue::new();
    let clock = ManualClock::at(100);
    let mut relay = MockRelay::new();
    let mut sink = LogSink::new();

    let mut ble = BleAdapter::new(device_id::hostname(&[0, 0, 0, 1, 2, 3]), intake);
    ble.start();
    assert_eq!(ble.device_name(), "relaygate-010203");

    let mut app = AppService::new(&cfg, &renders, &mut relay);
    ble.on_command_write(crypto::encrypt_duration(3, &cfg.key()).as_bytes());

    // Nothing happens until the control loop drains.
    assert_eq!(app.relay_state(), RelayState::Idle);
    assert_eq!(app.poll(intake, &clock, &mut relay, &mut sink), 1);
    assert_eq!(app.relay_state(), RelayState::Active { end_ms: 3_100 });
    assert!(relay.is_energised_now());
}
