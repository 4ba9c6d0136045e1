//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the device if the control loop stalls. With the relay
//! energised, a hung loop would otherwise hold the door open forever.
//!
//! The control loop must call `feed()` on every iteration.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::{info, warn};

pub struct Watchdog {
    timeout_ms: u32,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Initialise and subscribe the current task to the TWDT.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            let subscribed = unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    warn!("TWDT reconfigure returned {} (may already be configured)", ret);
                }
                let ret = esp_task_wdt_add(core::ptr::null_mut());
                if ret != ESP_OK {
                    warn!("Watchdog: failed to subscribe ({})", ret);
                }
                ret == ESP_OK
            };
            if subscribed {
                info!("Watchdog: subscribed ({} ms timeout, panic on trigger)", timeout_ms);
            }
            Self {
                timeout_ms,
                subscribed,
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): no-op ({} ms)", timeout_ms);
            if timeout_ms == 0 {
                warn!("Watchdog(sim): zero timeout");
            }
            Self { timeout_ms }
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Feed the watchdog.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}
