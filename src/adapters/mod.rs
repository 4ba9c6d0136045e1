//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements   | Connects to                  |
//! |-------------|--------------|------------------------------|
//! | `ble`       | -            | Bluedroid GATT → IntakeQueue |
//! | `device_id` | -            | eFuse factory MAC            |
//! | `display`   | DisplayPort  | Serial log (panel stand-in)  |
//! | `log_sink`  | EventSink    | Serial log output            |
//! | `nvs`       | StoragePort  | NVS / in-memory store        |
//! | `time`      | ClockPort    | ESP32 high-resolution timer  |

pub mod ble;
pub mod device_id;
pub mod display;
pub mod log_sink;
pub mod nvs;
pub mod time;
