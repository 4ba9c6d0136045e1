//! Log-backed display adapter.
//!
//! Implements [`DisplayPort`] by describing each screen on the serial
//! log. The e-ink panel layout it mirrors: a "Device ID:" caption with the
//! QR code at (30, 30), or "Remaining time:" with the seconds below. A
//! panel driver implements the same trait and blits [`identity_qr`] one
//! pixel per module.

use std::io;
use std::thread::JoinHandle;

use log::{info, warn};
use qrcodegen::{DataTooLong, QrCode, QrCodeEcc, QrSegment, Version};

use crate::app::ports::DisplayPort;
use crate::app::presenter::IdentityPresenter;
use crate::app::render::RenderQueue;
use crate::drivers::task_pin::{Core, spawn_on_core};

/// QR symbol version of the identity code: 29 x 29 modules, which holds
/// any identity up to [`MAX_IDENTITY_LEN`](crate::config::MAX_IDENTITY_LEN)
/// bytes at low error correction.
pub const QR_VERSION: u8 = 3;

/// Encode `identity` as a fixed-version, low-ECC QR symbol.
pub fn identity_qr(identity: &str) -> Result<QrCode, DataTooLong> {
    let segs = QrSegment::make_segments(identity);
    let version = Version::new(QR_VERSION);
    QrCode::encode_segments_advanced(&segs, QrCodeEcc::Low, version, version, None, false)
}

/// One text row per module row, two characters per module.
pub fn qr_rows(qr: &QrCode) -> impl Iterator<Item = String> + '_ {
    let size = qr.size();
    (0..size).map(move |y| {
        (0..size)
            .map(|x| if qr.get_module(x, y) { "##" } else { "  " })
            .collect()
    })
}

#[derive(Default)]
pub struct LogDisplay {
    refreshes: u32,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full refreshes performed since boot.
    pub fn refreshes(&self) -> u32 {
        self.refreshes
    }
}

impl DisplayPort for LogDisplay {
    fn show_identity(&mut self, identity: &str) {
        self.refreshes = self.refreshes.wrapping_add(1);
        match identity_qr(identity) {
            Ok(qr) => {
                info!("DISPLAY | Device ID: {} | QR {}x{}", identity, qr.size(), qr.size());
                for row in qr_rows(&qr) {
                    info!("DISPLAY | {}", row);
                }
            }
            Err(e) => warn!("DISPLAY | Device ID: {} | no QR ({})", identity, e),
        }
    }

    fn show_countdown(&mut self, secs: u32) {
        self.refreshes = self.refreshes.wrapping_add(1);
        info!("DISPLAY | Remaining time: {} seconds", secs);
    }
}

// ── Display task ─────────────────────────────────────────────

/// Run the presenter on a local executor until the thread is torn down.
fn run_display_loop(
    presenter: IdentityPresenter,
    queue: &'static RenderQueue,
    mut display: impl DisplayPort,
) {
    let executor: edge_executor::LocalExecutor<'_, 2> = edge_executor::LocalExecutor::new();
    executor
        .spawn(async move { presenter.run(queue, &mut display).await })
        .detach();

    info!("Display task started");
    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
}

/// Spawn the display task pinned to Core 1 (APP_CPU), below the control
/// loop's priority so a panel refresh never delays a relay shutoff.
pub fn spawn_display_task(
    presenter: IdentityPresenter,
    queue: &'static RenderQueue,
    display: impl DisplayPort + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    spawn_on_core(Core::App, 3, 16, "display\0", move || {
        run_display_loop(presenter, queue, display);
    })
}
