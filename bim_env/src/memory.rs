//! In-memory settings store and recording bus.
//!
//! Used by the hosting binary (fed from stdin), by the simulation harness
//! and by tests.

use crate::bus::{BusCall, BusSink};
use crate::error::EnvError;
use crate::settings::{ChangeNotifier, SettingsSource, Subscription};
use crate::types::{AlarmId, AlarmSnapshot, Timestamp};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Settings store held in memory.
///
/// Every mutation signals subscribers, like the real store does on write.
#[derive(Debug, Default)]
pub struct MemorySettings {
    alarms: Mutex<Option<AlarmSnapshot>>,
    notifier: ChangeNotifier,
    refuse_subscriptions: AtomicBool,
}

impl MemorySettings {
    /// Creates an empty store (`get_alarms()` returns `None`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `alarms`.
    pub fn with_alarms(alarms: AlarmSnapshot) -> Self {
        Self {
            alarms: Mutex::new(Some(alarms)),
            ..Self::default()
        }
    }

    /// Replaces the stored list and notifies subscribers.
    pub fn set_alarms(&self, alarms: AlarmSnapshot) -> usize {
        debug!("Settings store now holds {} alarms", alarms.len());
        *lock(&self.alarms) = Some(alarms);
        self.notifier.notify()
    }

    /// Empties the store (reads return `None`) and notifies subscribers.
    pub fn clear(&self) -> usize {
        *lock(&self.alarms) = None;
        self.notifier.notify()
    }

    /// Signals a change without touching the data.
    pub fn notify(&self) -> usize {
        self.notifier.notify()
    }

    /// Makes later `subscribe()` calls fail.
    pub fn refuse_subscriptions(&self, refuse: bool) {
        self.refuse_subscriptions.store(refuse, Ordering::SeqCst);
    }

    /// Ends all subscriptions; consumers see the source go away.
    pub fn close(&self) {
        self.notifier.close();
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.notifier.subscriber_count()
    }
}

impl SettingsSource for MemorySettings {
    fn get_alarms(&self) -> Option<AlarmSnapshot> {
        lock(&self.alarms).clone()
    }

    fn subscribe(&self) -> Result<Subscription, EnvError> {
        if self.refuse_subscriptions.load(Ordering::SeqCst) {
            return Err(EnvError::subscribe("settings store refused subscription"));
        }
        Ok(self.notifier.subscribe())
    }
}

/// Bus sink that records every accepted call in order.
///
/// Can be switched to reject sends, to exercise the failure path.
#[derive(Debug, Default)]
pub struct RecordingBus {
    calls: Mutex<Vec<BusCall>>,
    failing: AtomicBool,
    rejected: AtomicUsize,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the accepted calls.
    pub fn calls(&self) -> Vec<BusCall> {
        lock(&self.calls).clone()
    }

    /// Returns the accepted calls and forgets them.
    pub fn take_calls(&self) -> Vec<BusCall> {
        std::mem::take(&mut *lock(&self.calls))
    }

    /// When set, every send is rejected with [`EnvError::BusSend`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of calls rejected so far.
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    fn record(&self, call: BusCall) -> Result<(), EnvError> {
        if self.failing.load(Ordering::SeqCst) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(EnvError::bus(format!("rejected {call:?}")));
        }
        lock(&self.calls).push(call);
        Ok(())
    }
}

impl BusSink for RecordingBus {
    fn add_alarm(&self, clock_id: &AlarmId, timestamp: Timestamp) -> Result<(), EnvError> {
        self.record(BusCall::AddAlarm {
            clock_id: clock_id.clone(),
            timestamp,
        })
    }

    fn remove_alarm(&self, clock_id: &AlarmId) -> Result<(), EnvError> {
        self.record(BusCall::RemoveAlarm {
            clock_id: clock_id.clone(),
        })
    }
}
