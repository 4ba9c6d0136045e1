//! Command block decryption.
//!
//! A command is a single AES-128 block, ECB, no padding, no MAC:
//!
//! ```text
//!  plaintext  [ secs (u32 BE) | 12 bytes, unused ]
//!                    │
//!          AES-128-ECB(key)
//!                    ▼
//!  ciphertext [          16 bytes                ]  ──▶ BLE write
//! ```
//!
//! Only the first four plaintext bytes carry meaning. There is no
//! integrity check, so *every* 16-byte input decrypts to some duration;
//! a forged or corrupted write cannot be told apart from a real one here.
//!
//! Writes that are not exactly 16 bytes are zero-padded or truncated to a
//! block rather than rejected. The coercion is reported as a
//! [`LengthFault`] next to the result so callers can log it.

use aes::Aes128;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use core::fmt::{self, Write};

use crate::error::LengthFault;

/// AES block and key size in bytes.
pub const BLOCK_LEN: usize = 16;

/// Seconds of relay on-time carried by one command.
pub type DurationSecs = u32;

// ───────────────────────────────────────────────────────────────
// Key
// ───────────────────────────────────────────────────────────────

/// 128-bit command key shared with the companion app.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; BLOCK_LEN]);

impl EncryptionKey {
    pub const fn new(bytes: [u8; BLOCK_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a key from arbitrary bytes, zero-padding or truncating to 16.
    pub fn coerce(raw: &[u8]) -> (Self, Option<LengthFault>) {
        (Self(to_block(raw)), LengthFault::check(raw.len(), BLOCK_LEN))
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_LEN] {
        &self.0
    }

    /// Short SHA-256 prefix, safe to print.
    pub fn fingerprint(&self) -> heapless::String<8> {
        let digest = hmac_sha256::Hash::hash(&self.0);
        let mut out = heapless::String::new();
        for b in &digest[..4] {
            let _ = write!(out, "{:02x}", b);
        }
        out
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKey({})", self.fingerprint())
    }
}

// ───────────────────────────────────────────────────────────────
// Cipher block
// ───────────────────────────────────────────────────────────────

/// One ciphertext block as received over the air.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherBlock([u8; BLOCK_LEN]);

impl CipherBlock {
    pub const fn new(bytes: [u8; BLOCK_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a block from a raw write, zero-padding or truncating to 16.
    pub fn coerce(raw: &[u8]) -> (Self, Option<LengthFault>) {
        (Self(to_block(raw)), LengthFault::check(raw.len(), BLOCK_LEN))
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_LEN] {
        &self.0
    }
}

/// Result of decrypting one raw write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decrypted {
    /// Duration taken from plaintext bytes 0..4, big-endian.
    pub secs: DurationSecs,
    /// Set when the write had to be padded or truncated first.
    pub fault: Option<LengthFault>,
}

// ───────────────────────────────────────────────────────────────
// Operations
// ───────────────────────────────────────────────────────────────

/// Decrypt a block and return the full 16-byte plaintext.
pub fn decrypt_block(block: &CipherBlock, key: &EncryptionKey) -> [u8; BLOCK_LEN] {
    let cipher = Aes128::new(&key.0.into());
    let mut buf = aes::Block::from(block.0);
    cipher.decrypt_block(&mut buf);
    let mut plain = [0u8; BLOCK_LEN];
    plain.copy_from_slice(&buf);
    plain
}

/// Decrypt a block and derive the relay duration.
pub fn decrypt(block: &CipherBlock, key: &EncryptionKey) -> DurationSecs {
    let plain = decrypt_block(block, key);
    u32::from_be_bytes([plain[0], plain[1], plain[2], plain[3]])
}

/// Intake entry point: coerce a raw write to a block, then decrypt.
/// Never fails.
pub fn decrypt_payload(raw: &[u8], key: &EncryptionKey) -> Decrypted {
    let (block, fault) = CipherBlock::coerce(raw);
    Decrypted {
        secs: decrypt(&block, key),
        fault,
    }
}

/// Build the command block for `secs`: big-endian seconds followed by
/// twelve zero bytes, encrypted under `key`.
pub fn encrypt_duration(secs: DurationSecs, key: &EncryptionKey) -> CipherBlock {
    let mut plain = [0u8; BLOCK_LEN];
    plain[..4].copy_from_slice(&secs.to_be_bytes());
    let cipher = Aes128::new(&key.0.into());
    let mut buf = aes::Block::from(plain);
    cipher.encrypt_block(&mut buf);
    let mut out = [0u8; BLOCK_LEN];
    out.copy_from_slice(&buf);
    CipherBlock(out)
}

fn to_block(raw: &[u8]) -> [u8; BLOCK_LEN] {
    let mut block = [0u8; BLOCK_LEN];
    let n = raw.len().min(BLOCK_LEN);
    block[..n].copy_from_slice(&raw[..n]);
    block
}
