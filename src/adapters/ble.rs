//! BLE command adapter.
//!
//! A single GATT service with two write-only characteristics. Writes are
//! copied into the [`IntakeQueue`] and nothing else happens in the
//! Bluedroid task; the control loop does the decrypting.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid BLE GATT server via `esp_idf_svc::sys`.
//! - **all other targets**: simulation; tests call the `on_*` hooks directly.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                                   | Perms |
//! |----------------|----------------------------------------|-------|
//! | Service        | `12345678-1234-1234-1234-1234567890ab` |       |
//! | Command        | `dcba4321-1234-1234-1234-1234567890ab` | Write |
//! | Key (legacy)   | `abcd1234-1234-1234-1234-1234567890ab` | Write |
//!
//! ## Advertising
//!
//! The advertising packet carries the flags and the 128-bit service UUID
//! so scanners can filter on it; the device name goes in the scan
//! response. Advertising starts once Bluedroid has acknowledged both
//! payloads, and restarts after every disconnect.

use log::info;

use crate::app::intake::{IntakeQueue, WriteKind};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x12345678_1234_1234_1234_1234567890ab;
pub const CHAR_COMMAND: u128 = 0xdcba4321_1234_1234_1234_1234567890ab;
pub const CHAR_KEY: u128 = 0xabcd1234_1234_1234_1234_1234567890ab;

/// Legacy advertising and scan response payloads are capped at 31 bytes.
pub const ADV_PAYLOAD_MAX: usize = 31;

/// Bytes of the advertising packet: flags AD (3) + complete UUID128 AD (18).
pub const fn adv_payload_len() -> usize {
    3 + 2 + 16
}

/// Bytes of the scan response: one complete-local-name AD.
pub const fn scan_rsp_len(name: &str) -> usize {
    2 + name.len()
}

/// Service UUID in the little-endian order the air interface uses.
pub const fn service_uuid_le() -> [u8; 16] {
    SERVICE_UUID.to_le_bytes()
}

// ───────────────────────────────────────────────────────────────
// BLE state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Failed,
}

// ── ESP-IDF BLE static state ───────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures. These statics bridge the callback context to the queue.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_COMMAND_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_KEY_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CHAR_STEP: AtomicU32 = AtomicU32::new(0);
/// Payloads Bluedroid has not yet acknowledged (`ADV_PENDING_*` bits).
#[cfg(target_os = "espidf")]
static BLE_ADV_PENDING: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
const ADV_PENDING_DATA: u32 = 1 << 0;
#[cfg(target_os = "espidf")]
const ADV_PENDING_SCAN_RSP: u32 = 1 << 1;
#[cfg(target_os = "espidf")]
static BLE_INTAKE: std::sync::OnceLock<&'static IntakeQueue> = std::sync::OnceLock::new();

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    unsafe {
        t.uuid.uuid128 = uuid.to_le_bytes();
    }
    t
}

#[cfg(target_os = "espidf")]
unsafe fn add_write_char(svc_handle: u16, uuid: u128) {
    use esp_idf_svc::sys::*;
    let mut char_uuid = uuid128_to_esp(uuid);
    unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut char_uuid,
            ESP_GATT_PERM_WRITE as esp_gatt_perm_t,
            ESP_GATT_CHAR_PROP_BIT_WRITE as esp_gatt_char_prop_t,
            core::ptr::null_mut(),
            core::ptr::null_mut(),
        );
    }
}

/// Hand both payloads to Bluedroid. Advertising starts from the GAP
/// handler once both are acknowledged.
#[cfg(target_os = "espidf")]
unsafe fn configure_advertising() -> bool {
    use esp_idf_svc::sys::*;

    let mut uuid = service_uuid_le();
    let mut adv_data = esp_ble_adv_data_t {
        set_scan_rsp: false,
        include_name: false,
        include_txpower: false,
        min_interval: 0x0006,
        max_interval: 0x0010,
        appearance: 0,
        manufacturer_len: 0,
        p_manufacturer_data: core::ptr::null_mut(),
        service_data_len: 0,
        p_service_data: core::ptr::null_mut(),
        service_uuid_len: uuid.len() as u16,
        p_service_uuid: uuid.as_mut_ptr(),
        flag: (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8,
    };
    let mut scan_rsp = esp_ble_adv_data_t {
        set_scan_rsp: true,
        include_name: true,
        service_uuid_len: 0,
        p_service_uuid: core::ptr::null_mut(),
        flag: 0,
        ..adv_data
    };

    BLE_ADV_PENDING.store(ADV_PENDING_DATA | ADV_PENDING_SCAN_RSP, AtomicOrdering::Release);
    // Bluedroid deep-copies both structures before returning.
    let ret = unsafe { esp_ble_gap_config_adv_data(&mut adv_data) };
    if ret != ESP_OK as i32 {
        log::error!("BLE: config_adv_data failed ({})", ret);
        return false;
    }
    let ret = unsafe { esp_ble_gap_config_adv_data(&mut scan_rsp) };
    if ret != ESP_OK as i32 {
        log::error!("BLE: config scan response failed ({})", ret);
        return false;
    }
    true
}

/// Clear one pending bit; start advertising when none remain.
#[cfg(target_os = "espidf")]
fn adv_payload_set(bit: u32) {
    let before = BLE_ADV_PENDING.fetch_and(!bit, AtomicOrdering::AcqRel);
    if before & bit != 0 && before & !bit == 0 {
        unsafe { start_advertising() };
    }
}

#[cfg(target_os = "espidf")]
unsafe fn start_advertising() {
    use esp_idf_svc::sys::*;
    let mut adv_params = esp_ble_adv_params_t {
        adv_int_min: 0x20,
        adv_int_max: 0x40,
        adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
        own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
        adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
        ..unsafe { core::mem::zeroed() }
    };
    unsafe {
        esp_ble_gap_start_advertising(&mut adv_params);
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    _param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => {
            adv_payload_set(ADV_PENDING_DATA);
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_SET_COMPLETE_EVT => {
            adv_payload_set(ADV_PENDING_SCAN_RSP);
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising started");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising stopped");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid128_to_esp(SERVICE_UUID),
                    inst_id: 0,
                },
                is_primary: true,
            };
            // Service + 2 × (declaration + value).
            unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, 6) };
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let svc_handle = unsafe { (*param).create.service_handle };
            BLE_SVC_HANDLE.store(svc_handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: service created (handle={})", svc_handle);
            unsafe { esp_ble_gatts_start_service(svc_handle) };
            BLE_CHAR_STEP.store(1, AtomicOrdering::Relaxed);
            unsafe { add_write_char(svc_handle, CHAR_COMMAND) };
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let handle = unsafe { (*param).add_char.attr_handle };
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            match BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) {
                1 => {
                    BLE_COMMAND_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: command char (handle={})", handle);
                    BLE_CHAR_STEP.store(2, AtomicOrdering::Relaxed);
                    unsafe { add_write_char(svc_handle, CHAR_KEY) };
                }
                2 => {
                    BLE_KEY_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    BLE_CHAR_STEP.store(3, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: key char (handle={}), all registered", handle);
                }
                _ => {}
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let conn_id = unsafe { (*param).connect.conn_id };
            log::info!("BLE GATTS: client connected (conn_id={})", conn_id);
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            log::info!("BLE GATTS: client disconnected, re-advertising");
            unsafe { start_advertising() };
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            let handle = p.handle as u32;
            let data: &[u8] = if p.value.is_null() {
                &[]
            } else {
                unsafe { core::slice::from_raw_parts(p.value, p.len as usize) }
            };

            let kind = if handle == BLE_COMMAND_CHAR_HANDLE.load(AtomicOrdering::Relaxed) {
                WriteKind::Command
            } else if handle == BLE_KEY_CHAR_HANDLE.load(AtomicOrdering::Relaxed) {
                WriteKind::Key
            } else {
                return;
            };
            if let Some(intake) = BLE_INTAKE.get() {
                intake.submit(kind, data);
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

pub struct BleAdapter {
    state: BleState,
    device_name: heapless::String<24>,
    intake: &'static IntakeQueue,
}

impl BleAdapter {
    pub fn new(device_name: heapless::String<24>, intake: &'static IntakeQueue) -> Self {
        Self {
            state: BleState::Idle,
            device_name,
            intake,
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    pub fn device_name(&self) -> &str {
        self.device_name.as_str()
    }

    pub fn is_active(&self) -> bool {
        self.state == BleState::Advertising
    }

    /// Bring up the stack and start advertising.
    pub fn start(&mut self) {
        info!("BLE: starting advertising as '{}'", self.device_name);
        self.state = if self.platform_start() {
            BleState::Advertising
        } else {
            BleState::Failed
        };
    }

    /// Command characteristic write. Returns `false` if the intake queue
    /// was full.
    pub fn on_command_write(&self, raw: &[u8]) -> bool {
        self.intake.submit(WriteKind::Command, raw)
    }

    /// Key characteristic write.
    pub fn on_key_write(&self, raw: &[u8]) -> bool {
        self.intake.submit(WriteKind::Key, raw)
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self) -> bool {
        use esp_idf_svc::sys::*;

        if BLE_INTAKE.set(self.intake).is_err() {
            log::warn!("BLE: intake already registered");
        }

        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_init failed ({})", ret);
                return false;
            }
            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_enable failed ({})", ret);
                return false;
            }
            let ret = esp_bluedroid_init();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_init failed ({})", ret);
                return false;
            }
            let ret = esp_bluedroid_enable();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_enable failed ({})", ret);
                return false;
            }

            esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            esp_ble_gatts_app_register(0);

            let mut name = [0u8; 25];
            let bytes = self.device_name.as_bytes();
            name[..bytes.len()].copy_from_slice(bytes);
            esp_ble_gap_set_device_name(name.as_ptr() as *const _);

            if !configure_advertising() {
                return false;
            }
        }
        info!(
            "BLE(espidf): Bluedroid stack initialized, advertising as '{}'",
            self.device_name
        );
        true
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self) -> bool {
        info!(
            "BLE(sim): advertising '{}' (service {:032x})",
            self.device_name, SERVICE_UUID
        );
        true
    }

}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_adapter() -> (BleAdapter, &'static IntakeQueue) {
        let intake: &'static IntakeQueue = Box::leak(Box::new(IntakeQueue::new()));
        let name = heapless::String::<24>::try_from("relaygate-test").unwrap();
        (BleAdapter::new(name, intake), intake)
    }

    #[test]
    fn start_lifecycle() {
        let (mut adapter, _) = make_adapter();
        assert_eq!(adapter.state(), BleState::Idle);
        assert!(!adapter.is_active());
        adapter.start();
        assert_eq!(adapter.state(), BleState::Advertising);
        assert!(adapter.is_active());
    }

    #[test]
    fn advertised_uuid_is_little_endian() {
        let le = service_uuid_le();
        assert_eq!(le[0], 0xab);
        assert_eq!(le[15], 0x12);
    }

    #[test]
    fn advertising_payloads_fit_legacy_limit() {
        assert!(adv_payload_len() <= ADV_PAYLOAD_MAX);
        // Longest name `device_id::hostname` produces.
        assert!(scan_rsp_len("relaygate-ffffff") <= ADV_PAYLOAD_MAX);
        // UUID128 and the name together would not fit one packet.
        assert!(adv_payload_len() + scan_rsp_len("relaygate-ffffff") > ADV_PAYLOAD_MAX);
    }

    #[test]
    fn writes_are_routed_by_characteristic() {
        let (adapter, intake) = make_adapter();
        assert!(adapter.on_command_write(&[0x11; 16]));
        assert!(adapter.on_key_write(b"new-key"));
        let first = intake.try_next().unwrap();
        assert_eq!(first.kind, WriteKind::Command);
        assert_eq!(first.len, 16);
        let second = intake.try_next().unwrap();
        assert_eq!(second.kind, WriteKind::Key);
        assert_eq!(&second.data[..], b"new-key");
    }

    #[test]
    fn writes_do_not_require_a_connection() {
        let (adapter, intake) = make_adapter();
        assert_eq!(adapter.state(), BleState::Idle);
        adapter.on_command_write(&[0; 16]);
        assert_eq!(intake.len(), 1);
    }

    #[test]
    fn uuids_match_layout() {
        assert_eq!(
            format!("{:032x}", SERVICE_UUID),
            "123456781234123412341234567890ab"
        );
        assert_eq!(CHAR_COMMAND >> 96, 0xdcba4321);
        assert_eq!(CHAR_KEY >> 96, 0xabcd1234);
    }
}
