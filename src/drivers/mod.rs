//! Actuator drivers and task helpers.

pub mod relay_out;
pub mod task_pin;
pub mod watchdog;
