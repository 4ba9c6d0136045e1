//! Application core: pure domain logic, zero I/O.
//!
//! Command intake, the relay timer owner, and the identity presenter.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod intake;
pub mod ports;
pub mod presenter;
pub mod render;
pub mod service;
