//! GPIO / peripheral pin assignments for the RelayGate board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.
//!
//! The e-ink panel sits behind `DisplayPort` and is not wired here. On the
//! reference board its SPI chip select is the default `SS` (GPIO 5), which
//! collides with the relay; move CS before fitting a panel driver.

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Digital output: HIGH = relay coil energised (strike released).
pub const RELAY_GPIO: i32 = 5;
