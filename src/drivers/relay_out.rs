//! Relay output driver.
//!
//! Wraps any `embedded-hal` [`OutputPin`] (an `esp-idf-hal` `PinDriver` on
//! the device) and implements [`RelayPort`]. The pin is the only thing
//! that can energise the load, and only [`RelayTimer`](crate::relay::RelayTimer)
//! drives it.
//!
//! A failed pin write is logged and the cached level keeps the *requested*
//! state, so a stuck "on" is visible in the log rather than masked.

use embedded_hal::digital::OutputPin;
use log::error;

use crate::app::ports::RelayPort;

pub struct RelayDriver<P: OutputPin> {
    pin: P,
    energised: bool,
    active_high: bool,
}

impl<P: OutputPin> RelayDriver<P> {
    /// Active-high relay (HIGH = coil energised). Does not touch the pin;
    /// the timer forces it off at construction.
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            energised: false,
            active_high: true,
        }
    }

    /// Relay modules with an inverting transistor stage.
    pub fn active_low(pin: P) -> Self {
        Self {
            active_high: false,
            ..Self::new(pin)
        }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> RelayPort for RelayDriver<P> {
    fn set_energised(&mut self, on: bool) {
        let high = on == self.active_high;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = res {
            error!("Relay: pin write failed ({:?})", embedded_hal::digital::Error::kind(&e));
        }
        self.energised = on;
    }

    fn is_energised(&self) -> bool {
        self.energised
    }
}
