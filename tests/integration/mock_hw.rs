//! Mock adapters for integration tests.
//!
//! Record every relay write and screen draw so tests can assert on the
//! full history without touching real GPIO or a panel.

use std::cell::Cell;
use std::collections::HashMap;

use relaygate::app::events::AppEvent;
use relaygate::app::ports::{ClockPort, DisplayPort, EventSink, RelayPort, StorageError, StoragePort};

// ── MockRelay ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockRelay {
    /// Every level written, in order.
    pub writes: Vec<bool>,
}

#[allow(dead_code)]
impl MockRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_energised_now(&self) -> bool {
        RelayPort::is_energised(self)
    }

    /// Number of off→on edges seen.
    pub fn engagements(&self) -> usize {
        let mut prev = false;
        let mut n = 0;
        for &w in &self.writes {
            if w && !prev {
                n += 1;
            }
            prev = w;
        }
        n
    }
}

impl RelayPort for MockRelay {
    fn set_energised(&mut self, on: bool) {
        self.writes.push(on);
    }

    fn is_energised(&self) -> bool {
        self.writes.last().copied().unwrap_or(false)
    }
}

// ── MockDisplay ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Identity(String),
    Countdown(u32),
}

#[derive(Default)]
pub struct MockDisplay {
    pub screens: Vec<Screen>,
}

#[allow(dead_code)]
impl MockDisplay {
    pub fn identity_renders(&self) -> usize {
        self.screens
            .iter()
            .filter(|s| matches!(s, Screen::Identity(_)))
            .count()
    }
}

impl DisplayPort for MockDisplay {
    fn show_identity(&mut self, identity: &str) {
        self.screens.push(Screen::Identity(identity.into()));
    }

    fn show_countdown(&mut self, secs: u32) {
        self.screens.push(Screen::Countdown(secs));
    }
}

// ── ManualClock ───────────────────────────────────────────────

#[derive(Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(ms: u64) -> Self {
        Self { now: Cell::new(ms) }
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl ClockPort for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

// ── MockNvs ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockNvs {
    store: HashMap<String, Vec<u8>>,
    pub fail: bool,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn raw(&self, namespace: &str, key: &str) -> Option<&Vec<u8>> {
        self.store.get(&format!("{}::{}", namespace, key))
    }
}

impl StoragePort for MockNvs {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        if self.fail {
            return Err(StorageError::Unavailable);
        }
        match self.store.get(&format!("{}::{}", namespace, key)) {
            Some(v) => {
                let n = v.len().min(buf.len());
                buf[..n].copy_from_slice(&v[..n]);
                Ok(n)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail {
            return Err(StorageError::Unavailable);
        }
        self.store
            .insert(format!("{}::{}", namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.remove(&format!("{}::{}", namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store.contains_key(&format!("{}::{}", namespace, key))
    }
}

// ── LogSink ───────────────────────────────────────────────────

#[derive(Default)]
pub struct LogSink {
    pub events: Vec<AppEvent>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
