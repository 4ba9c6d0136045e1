//! Device configuration.
//!
//! Identity and command key are read from NVS at boot. On first boot
//! the compiled defaults are written back so later boots see the same
//! values. Storage failures never halt the device; it falls back to the
//! defaults and keeps running.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};
use crate::crypto::{BLOCK_LEN, EncryptionKey};
use crate::error::Error;

/// NVS namespace for everything this firmware persists.
pub const NAMESPACE: &str = "relaygate";
pub const KEY_DEVICE_ID: &str = "device_id";
pub const KEY_ENC_KEY: &str = "enc_key";

/// Longest identity that fits the e-ink QR layout.
pub const MAX_IDENTITY_LEN: usize = 32;

/// Compiled-in command key used until one is provisioned.
pub const DEFAULT_KEY: [u8; BLOCK_LEN] = *b"MySecureKey12\0\0\0";

/// Opaque identity token shown as the QR payload.
pub type DeviceIdentity = heapless::String<MAX_IDENTITY_LEN>;

/// Core device configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// QR payload.
    pub device_id: DeviceIdentity,
    /// AES-128 command key.
    pub encryption_key: [u8; BLOCK_LEN],
    /// Accept writes on the legacy key characteristic.
    pub accept_key_writes: bool,
    /// Control loop sleep between ticks (milliseconds).
    pub poll_interval_ms: u32,
    /// Task watchdog timeout (milliseconds).
    pub watchdog_timeout_ms: u32,
}

impl DeviceConfig {
    /// Defaults with the given identity.
    pub fn with_identity(device_id: DeviceIdentity) -> Self {
        Self {
            device_id,
            encryption_key: DEFAULT_KEY,
            accept_key_writes: true,
            poll_interval_ms: 10,
            watchdog_timeout_ms: 5_000,
        }
    }

    pub fn key(&self) -> EncryptionKey {
        EncryptionKey::new(self.encryption_key)
    }

    /// Range-check before anything is persisted or used.
    pub fn validate(&self) -> Result<(), Error> {
        validate_identity(&self.device_id)?;
        if !(1..=1000).contains(&self.poll_interval_ms) {
            return Err(Error::Config("poll_interval_ms must be in 1..=1000"));
        }
        if self.watchdog_timeout_ms <= self.poll_interval_ms {
            return Err(Error::Config(
                "watchdog_timeout_ms must exceed poll_interval_ms",
            ));
        }
        Ok(())
    }

    /// Load identity and key from `storage`, writing `defaults` for any
    /// missing entry. Each value falls back to its default on its own: a
    /// bad stored identity never discards a provisioned key.
    pub fn load(storage: &mut impl StoragePort, defaults: Self) -> Self {
        let mut cfg = defaults.clone();

        match load_identity(storage, &defaults.device_id) {
            Ok(id) => cfg.device_id = id,
            Err(e) => warn!("Config: device_id unavailable ({}), using default", e),
        }
        if validate_identity(&cfg.device_id).is_err() {
            warn!("Config: default device_id unusable, using fallback");
            cfg.device_id = fallback_identity();
        }
        match load_key(storage, &defaults.encryption_key) {
            Ok(key) => cfg.encryption_key = key,
            Err(e) => warn!("Config: enc_key unavailable ({}), using default", e),
        }

        if let Err(e) = cfg.validate() {
            warn!("Config: {}, using default timing", e);
            let base = Self::with_identity(fallback_identity());
            cfg.poll_interval_ms = base.poll_interval_ms;
            cfg.watchdog_timeout_ms = base.watchdog_timeout_ms;
        }

        info!(
            "Config: device_id={} key={}",
            cfg.device_id,
            cfg.key().fingerprint()
        );
        cfg
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::with_identity(fallback_identity())
    }
}

fn fallback_identity() -> DeviceIdentity {
    let mut id = DeviceIdentity::new();
    let _ = id.push_str("DEVICE_123");
    id
}

fn validate_identity(id: &str) -> Result<(), Error> {
    if id.is_empty() {
        return Err(Error::Config("device_id must not be empty"));
    }
    if !id.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
        return Err(Error::Config("device_id must be printable ASCII"));
    }
    Ok(())
}

fn load_identity(
    storage: &mut impl StoragePort,
    default: &DeviceIdentity,
) -> Result<DeviceIdentity, Error> {
    let mut buf = [0u8; MAX_IDENTITY_LEN];
    match storage.read(NAMESPACE, KEY_DEVICE_ID, &mut buf) {
        Ok(n) => {
            let s = core::str::from_utf8(&buf[..n])
                .map_err(|_| Error::Config("device_id must be printable ASCII"))?;
            validate_identity(s)?;
            let mut id = DeviceIdentity::new();
            id.push_str(s).map_err(|()| Error::Config("device_id too long"))?;
            Ok(id)
        }
        Err(StorageError::NotFound) => {
            info!("Config: first boot, storing device_id");
            storage.write(NAMESPACE, KEY_DEVICE_ID, default.as_bytes())?;
            Ok(default.clone())
        }
        Err(e) => Err(e.into()),
    }
}

fn load_key(
    storage: &mut impl StoragePort,
    default: &[u8; BLOCK_LEN],
) -> Result<[u8; BLOCK_LEN], StorageError> {
    let mut buf = [0u8; BLOCK_LEN];
    match storage.read(NAMESPACE, KEY_ENC_KEY, &mut buf) {
        Ok(n) if n == BLOCK_LEN => Ok(buf),
        Ok(n) => {
            warn!("Config: stored enc_key is {} bytes, expected {}", n, BLOCK_LEN);
            Err(StorageError::IoError)
        }
        Err(StorageError::NotFound) => {
            info!("Config: first boot, storing enc_key");
            storage.write(NAMESPACE, KEY_ENC_KEY, default)?;
            Ok(*default)
        }
        Err(e) => Err(e),
    }
}
