//! RelayGate Firmware: Main Entry Point
//!
//! Hexagonal architecture: one control loop owns the relay, one display
//! task owns the panel, and the BLE stack only ever enqueues.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  RelayDriver   LogEventSink   NvsAdapter    Esp32Time          │
//! │  (RelayPort)   (EventSink)    (StoragePort) (ClockPort)        │
//! │  BleAdapter ──▶ INTAKE        LogDisplay (DisplayPort)         │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │      AppService (pure logic)  ──▶ RENDER ──▶ Presenter │    │
//! │  │      key · RelayTimer                                  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyOutputPin, PinDriver};
use log::{error, info, warn};

use relaygate::adapters::ble::BleAdapter;
use relaygate::adapters::device_id;
use relaygate::adapters::display::{LogDisplay, spawn_display_task};
use relaygate::adapters::log_sink::LogEventSink;
use relaygate::adapters::nvs::NvsAdapter;
use relaygate::adapters::time::Esp32TimeAdapter;
use relaygate::app::intake::IntakeQueue;
use relaygate::app::presenter::IdentityPresenter;
use relaygate::app::render::RenderQueue;
use relaygate::app::service::AppService;
use relaygate::config::DeviceConfig;
use relaygate::drivers::relay_out::RelayDriver;
use relaygate::drivers::watchdog::Watchdog;
use relaygate::error::Error;

/// BLE task → control loop.
static INTAKE: IntakeQueue = IntakeQueue::new();
/// Control loop → display task.
static RENDER: RenderQueue = RenderQueue::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  RelayGate v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let mac = device_id::read_mac();
    let defaults = DeviceConfig::with_identity(device_id::device_id(&mac));
    let config = match NvsAdapter::new() {
        Ok(mut nvs) => DeviceConfig::load(&mut nvs, defaults),
        Err(e) => {
            warn!("{}, running with defaults and no persistence", Error::from(e));
            defaults
        }
    };

    // ── 3. Relay output, forced off before anything can command it ──
    // SAFETY: RELAY_GPIO is claimed nowhere else.
    let relay_pin = unsafe { AnyOutputPin::new(relaygate::RELAY_GPIO) };
    let pin = PinDriver::output(relay_pin).map_err(|_| Error::Init("relay GPIO"))?;
    let mut relay = RelayDriver::new(pin);
    let mut log_sink = LogEventSink::new();
    let clock = Esp32TimeAdapter::new();
    let mut app = AppService::new(&config, &RENDER, &mut relay);

    // ── 4. Display task ───────────────────────────────────────
    let presenter = IdentityPresenter::new(config.device_id.clone());
    if let Err(e) = spawn_display_task(presenter, &RENDER, LogDisplay::new()) {
        // The relay still works without a screen.
        error!("Display task spawn failed: {}", e);
    }

    // ── 5. BLE GATT server ────────────────────────────────────
    let mut ble = BleAdapter::new(device_id::hostname(&mac), &INTAKE);
    ble.start();
    if !ble.is_active() {
        warn!("BLE unavailable; relay stays off until reboot");
    }

    // ── 6. Boot identity render ───────────────────────────────
    app.start(&mut log_sink);

    let watchdog = Watchdog::new(config.watchdog_timeout_ms);
    info!(
        "System ready (poll {} ms). Entering control loop.",
        config.poll_interval_ms
    );

    // ── 7. Control loop ───────────────────────────────────────
    loop {
        app.poll(&INTAKE, &clock, &mut relay, &mut log_sink);
        watchdog.feed();
        FreeRtos::delay_ms(config.poll_interval_ms);
    }
}
