//! Relay on-time state machine.
//!
//! ```text
//!            activate(secs, now)            activate(secs, now)
//!   ┌──────┐ ─────────────────▶ ┌──────────────────┐ ◀──┐ (deadline
//!   │ Idle │                    │ Active{end_ms}   │ ───┘  overwritten)
//!   └──────┘ ◀───────────────── └──────────────────┘
//!             tick(now ≥ end_ms)
//! ```
//!
//! Polled, never interrupt-driven: the control loop calls [`RelayTimer::tick`]
//! as often as it likes and the call is a couple of comparisons. The
//! output pin is written only on the two transitions, through
//! [`RelayPort`], so the physical relay is on exactly while the state
//! is `Active`.
//!
//! Single owner: the timer lives inside the control loop's
//! [`AppService`](crate::app::service::AppService). Wireless writes
//! reach it only through the intake queue, so `activate` and `tick`
//! never run concurrently.

use log::{debug, info};

use crate::app::ports::RelayPort;
use crate::crypto::DurationSecs;

/// Relay state. `Active` carries the monotonic deadline in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Active { end_ms: u64 },
}

/// What a [`RelayTimer::tick`] observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do; the relay is off.
    Idle,
    /// Still on.
    Running { remaining_ms: u64 },
    /// The deadline passed on this tick and the relay was switched off.
    /// Reported once per activation.
    Expired,
}

pub struct RelayTimer {
    state: RelayState,
}

impl RelayTimer {
    /// Create the timer and force the output off.
    pub fn new(relay: &mut impl RelayPort) -> Self {
        relay.set_energised(false);
        Self {
            state: RelayState::Idle,
        }
    }

    /// Energise the relay until `now_ms + secs`. Overwrites any running
    /// deadline. Returns the new deadline.
    pub fn activate(&mut self, secs: DurationSecs, now_ms: u64, relay: &mut impl RelayPort) -> u64 {
        let end_ms = now_ms.saturating_add(u64::from(secs) * 1000);
        if let RelayState::Active { end_ms: prev } = self.state {
            info!("Relay: deadline {} ms -> {} ms (re-armed)", prev, end_ms);
        } else {
            info!("Relay: on for {} s (deadline {} ms)", secs, end_ms);
        }
        self.state = RelayState::Active { end_ms };
        relay.set_energised(true);
        end_ms
    }

    /// Release the relay once the deadline is reached.
    pub fn tick(&mut self, now_ms: u64, relay: &mut impl RelayPort) -> TickOutcome {
        match self.state {
            RelayState::Idle => TickOutcome::Idle,
            RelayState::Active { end_ms } if now_ms >= end_ms => {
                relay.set_energised(false);
                self.state = RelayState::Idle;
                debug!("Relay: off at {} ms (deadline {} ms)", now_ms, end_ms);
                TickOutcome::Expired
            }
            RelayState::Active { end_ms } => TickOutcome::Running {
                remaining_ms: end_ms - now_ms,
            },
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, RelayState::Active { .. })
    }

    /// Whole seconds left, rounded up. Zero when idle.
    pub fn remaining_secs(&self, now_ms: u64) -> u32 {
        match self.state {
            RelayState::Idle => 0,
            RelayState::Active { end_ms } => {
                let ms = end_ms.saturating_sub(now_ms);
                ms.div_ceil(1000).min(u64::from(u32::MAX)) as u32
            }
        }
    }
}
