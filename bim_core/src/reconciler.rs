//! Reconciler - mirrors a declarative alarm list onto the bim bus.
//!
//! The settings store holds *what* alarms exist; the bus only understands
//! *add* and *remove*. The reconciler remembers which ids it has already
//! added (the published set) and, for each snapshot, emits the smallest
//! sequence of bus calls that brings the downstream in line.
//!
//! # Per-alarm State Machine
//!
//! ```text
//!               ring_time parses
//!   UNKNOWN ─────────────────────────► PUBLISHED
//!      ▲         emit add_alarm            │
//!      │                                   │
//!      └───────────────────────────────────┘
//!          ring_time absent: emit remove_alarm
//! ```
//!
//! Every other input is a self-loop with no emission. With the default
//! [`ReconcilePolicy`], a published alarm whose time changes stays as is
//! and ids missing from a snapshot are left published.

use crate::record::{self, RecordError};
use bim_env::{AlarmId, AlarmRecord, BusSink, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Optional behaviors beyond plain add/remove mirroring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    /// Re-publish (remove then add) a published alarm whose ring time now
    /// maps to a different timestamp.
    pub republish_on_change: bool,

    /// Withdraw published alarms that no record of the snapshot names.
    pub withdraw_missing: bool,
}

/// Where one alarm id stands with respect to the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Unknown,
    Published,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// `add_alarm` calls issued
    pub added: usize,

    /// `remove_alarm` calls issued
    pub removed: usize,

    /// Records skipped as malformed or with an unparseable time
    pub skipped: usize,

    /// Calls the bus rejected (state was updated regardless)
    pub failed_sends: usize,
}

impl PassReport {
    /// True when the pass emitted nothing.
    pub fn is_quiet(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Owns the published set and drives the bus from snapshots.
#[derive(Debug, Default)]
pub struct Reconciler {
    /// Ids believed known to the bus, with the timestamp they were added at
    published: BTreeMap<AlarmId, Timestamp>,

    policy: ReconcilePolicy,
}

impl Reconciler {
    /// Creates a reconciler with an empty published set.
    pub fn new(policy: ReconcilePolicy) -> Self {
        Self {
            published: BTreeMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    /// Current state of `id`.
    pub fn state(&self, id: &str) -> AlarmState {
        if self.published.contains_key(id) {
            AlarmState::Published
        } else {
            AlarmState::Unknown
        }
    }

    pub fn is_published(&self, id: &str) -> bool {
        self.published.contains_key(id)
    }

    /// Timestamp `id` was last published with.
    pub fn published_at(&self, id: &str) -> Option<Timestamp> {
        self.published.get(id).copied()
    }

    /// Published ids in ascending order.
    pub fn published_ids(&self) -> impl Iterator<Item = &AlarmId> {
        self.published.keys()
    }

    pub fn len(&self) -> usize {
        self.published.len()
    }

    pub fn is_empty(&self) -> bool {
        self.published.is_empty()
    }

    /// Forgets every published id without telling the bus.
    pub fn clear(&mut self) {
        self.published.clear();
    }

    /// Runs one reconciliation pass over `snapshot`.
    ///
    /// Records are handled strictly in order; a record sees the state left
    /// by the ones before it, including earlier records with the same id.
    pub fn reconcile(&mut self, snapshot: &[AlarmRecord], bus: &dyn BusSink) -> PassReport {
        let mut report = PassReport::default();
        let mut seen = BTreeSet::new();

        for record in snapshot {
            if self.policy.withdraw_missing {
                if let Ok(id) = record::extract_id(record) {
                    seen.insert(id);
                }
            }

            let entry = match record::extract(record) {
                Ok(entry) => entry,
                Err(e) => {
                    info!("Skipping alarm record: {}", e);
                    report.skipped += 1;
                    continue;
                }
            };

            let published_at = self.published.get(&entry.id).copied();
            match (entry.ring_time, published_at) {
                (None, Some(_)) => self.remove(&entry.id, bus, &mut report),
                (None, None) => {}
                (Some(_), None) => match entry.timestamp() {
                    Some(Ok(timestamp)) => self.add(entry.id, timestamp, bus, &mut report),
                    Some(Err(e)) => self.skip(e, &mut report),
                    None => {}
                },
                (Some(_), Some(previous)) => {
                    if !self.policy.republish_on_change {
                        continue;
                    }
                    match entry.timestamp() {
                        Some(Ok(timestamp)) if timestamp != previous => {
                            debug!("Alarm {} moved from {} to {}", entry.id, previous, timestamp);
                            self.remove(&entry.id, bus, &mut report);
                            self.add(entry.id, timestamp, bus, &mut report);
                        }
                        Some(Err(e)) => self.skip(e, &mut report),
                        _ => {}
                    }
                }
            }
        }

        if self.policy.withdraw_missing {
            let missing: Vec<AlarmId> = self
                .published
                .keys()
                .filter(|id| !seen.contains(*id))
                .cloned()
                .collect();
            for id in missing {
                debug!("Alarm {} no longer listed", id);
                self.remove(&id, bus, &mut report);
            }
        }

        report
    }

    fn add(&mut self, id: AlarmId, timestamp: Timestamp, bus: &dyn BusSink, report: &mut PassReport) {
        info!("Adding alarm: {}", id);
        if let Err(e) = bus.add_alarm(&id, timestamp) {
            warn!("add_alarm({}, {}) failed: {}", id, timestamp, e);
            report.failed_sends += 1;
        }
        self.published.insert(id, timestamp);
        report.added += 1;
    }

    fn remove(&mut self, id: &AlarmId, bus: &dyn BusSink, report: &mut PassReport) {
        info!("Removing alarm: {}", id);
        if let Err(e) = bus.remove_alarm(id) {
            warn!("remove_alarm({}) failed: {}", id, e);
            report.failed_sends += 1;
        }
        self.published.remove(id);
        report.removed += 1;
    }

    fn skip(&self, error: RecordError, report: &mut PassReport) {
        info!("Skipping alarm record: {}", error);
        report.skipped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bim_env::{BusCall, RecordingBus};

    fn alarm(id: &str, ring_time: Option<&str>) -> AlarmRecord {
        AlarmRecord::alarm(id, ring_time)
    }

    fn add(id: &str, ts: Timestamp) -> BusCall {
        BusCall::add(id, ts).unwrap()
    }

    fn remove(id: &str) -> BusCall {
        BusCall::remove(id).unwrap()
    }

    fn published(reconciler: &Reconciler) -> Vec<&str> {
        reconciler.published_ids().map(AlarmId::as_str).collect()
    }

    #[test]
    fn test_bootstrap_add() {
        let bus = RecordingBus::new();
        let mut reconciler = Reconciler::default();

        let report = reconciler.reconcile(&[alarm("a", Some("2030-01-01T00:00:00Z"))], &bus);

        assert_eq!(bus.calls(), vec![add("a", 1893456000)]);
        assert_eq!(published(&reconciler), vec!["a"]);
        assert_eq!(report.added, 1);
        assert_eq!(reconciler.state("a"), AlarmState::Published);
    }

    #[test]
    fn test_disable_removes() {
        let bus = RecordingBus::new();
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&[alarm("a", Some("2030-01-01T00:00:00Z"))], &bus);
        bus.take_calls();

        let report = reconciler.reconcile(&[alarm("a", None)], &bus);

        assert_eq!(bus.calls(), vec![remove("a")]);
        assert!(reconciler.is_empty());
        assert_eq!(report.removed, 1);
        assert_eq!(reconciler.state("a"), AlarmState::Unknown);
    }

    #[test]
    fn test_mixed_pass_follows_snapshot_order() {
        let bus = RecordingBus::new();
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&[alarm("a", Some("2030-01-01T00:00:00Z"))], &bus);
        bus.take_calls();

        reconciler.reconcile(&[alarm("a", None), alarm("b", Some("2030-01-01T00:00:10Z"))], &bus);

        assert_eq!(bus.calls(), vec![remove("a"), add("b", 1893456010)]);
        assert_eq!(published(&reconciler), vec!["b"]);
    }

    #[test]
    fn test_renotification_is_quiet() {
        let bus = RecordingBus::new();
        let mut reconciler = Reconciler::default();
        let snapshot = vec![alarm("a", Some("2030-01-01T00:00:00Z"))];
        reconciler.reconcile(&snapshot, &bus);
        bus.take_calls();

        let report = reconciler.reconcile(&snapshot, &bus);

        assert!(report.is_quiet());
        assert!(bus.calls().is_empty());
    }

    #[test]
    fn test_malformed_records_skipped() {
        let bus = RecordingBus::new();
        let mut reconciler = Reconciler::default();
        let snapshot = vec![
            alarm("", Some("2030-01-01T00:00:00Z")),
            AlarmRecord::new().with("ring_time", "2030-01-01T00:00:00Z"),
            alarm("c", Some("not-a-date")),
        ];

        let report = reconciler.reconcile(&snapshot, &bus);

        assert!(bus.calls().is_empty());
        assert!(reconciler.is_empty());
        assert_eq!(report.skipped, 3);
    }

    #[test]
    fn test_absent_and_unknown_is_noop() {
        let bus = RecordingBus::new();
        let mut reconciler = Reconciler::default();

        let report = reconciler.reconcile(&[alarm("z", None)], &bus);

        assert!(bus.calls().is_empty());
        assert_eq!(report, PassReport::default());
    }

    #[test]
    fn test_duplicate_ids_see_previous_state() {
        let bus = RecordingBus::new();
        let mut reconciler = Reconciler::default();
        let snapshot = vec![
            alarm("a", Some("2030-01-01T00:00:00Z")),
            alarm("a", None),
            alarm("a", Some("2030-01-01T00:00:10Z")),
        ];

        reconciler.reconcile(&snapshot, &bus);

        assert_eq!(
            bus.calls(),
            vec![add("a", 1893456000), remove("a"), add("a", 1893456010)]
        );
        assert_eq!(reconciler.published_at("a"), Some(1893456010));
    }

    #[test]
    fn test_time_change_not_republished_by_default() {
        let bus = RecordingBus::new();
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&[alarm("a", Some("2030-01-01T00:00:00Z"))], &bus);
        bus.take_calls();

        reconciler.reconcile(&[alarm("a", Some("2031-01-01T00:00:00Z"))], &bus);
        reconciler.reconcile(&[alarm("a", Some("garbage"))], &bus);

        assert!(bus.calls().is_empty());
        assert_eq!(reconciler.published_at("a"), Some(1893456000));
    }

    #[test]
    fn test_time_change_republished_when_enabled() {
        let bus = RecordingBus::new();
        let mut reconciler = Reconciler::new(ReconcilePolicy {
            republish_on_change: true,
            ..ReconcilePolicy::default()
        });
        reconciler.reconcile(&[alarm("a", Some("2030-01-01T00:00:00Z"))], &bus);
        bus.take_calls();

        // Same instant spelled differently is not a change.
        reconciler.reconcile(&[alarm("a", Some("2030-01-01T01:00:00+01:00"))], &bus);
        assert!(bus.calls().is_empty());

        reconciler.reconcile(&[alarm("a", Some("2030-01-01T00:00:10Z"))], &bus);
        assert_eq!(bus.calls(), vec![remove("a"), add("a", 1893456010)]);

        // An unparseable new time leaves the old registration alone.
        bus.take_calls();
        let report = reconciler.reconcile(&[alarm("a", Some("garbage"))], &bus);
        assert!(bus.calls().is_empty());
        assert_eq!(report.skipped, 1);
        assert_eq!(reconciler.published_at("a"), Some(1893456010));
    }

    #[test]
    fn test_missing_ids_kept_by_default() {
        let bus = RecordingBus::new();
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&[alarm("a", Some("2030-01-01T00:00:00Z"))], &bus);
        bus.take_calls();

        reconciler.reconcile(&[], &bus);

        assert!(bus.calls().is_empty());
        assert!(reconciler.is_published("a"));
    }

    #[test]
    fn test_missing_ids_withdrawn_when_enabled() {
        let bus = RecordingBus::new();
        let mut reconciler = Reconciler::new(ReconcilePolicy {
            withdraw_missing: true,
            ..ReconcilePolicy::default()
        });
        reconciler.reconcile(
            &[
                alarm("c", Some("2030-01-01T00:00:00Z")),
                alarm("a", Some("2030-01-01T00:00:00Z")),
                alarm("b", Some("2030-01-01T00:00:00Z")),
            ],
            &bus,
        );
        bus.take_calls();

        // "b" still named (even with a bad time), "a" and "c" gone.
        reconciler.reconcile(&[alarm("b", Some("garbage")), alarm("d", None)], &bus);

        assert_eq!(bus.calls(), vec![remove("a"), remove("c")]);
        assert_eq!(published(&reconciler), vec!["b"]);
    }

    #[test]
    fn test_wrong_typed_ring_time_still_names_alarm() {
        let bus = RecordingBus::new();
        let mut reconciler = Reconciler::new(ReconcilePolicy {
            withdraw_missing: true,
            ..ReconcilePolicy::default()
        });
        reconciler.reconcile(
            &[
                alarm("a", Some("2030-01-01T00:00:00Z")),
                alarm("b", Some("2030-01-01T00:00:00Z")),
            ],
            &bus,
        );
        bus.take_calls();

        let snapshot = [
            AlarmRecord::new().with("id", "a").with("ring_time", 7i64),
            AlarmRecord::new().with("id", 3i64).with("ring_time", "2030-01-01T00:00:00Z"),
        ];
        let report = reconciler.reconcile(&snapshot, &bus);

        assert_eq!(bus.calls(), vec![remove("b")]);
        assert_eq!(report.skipped, 2);
        assert_eq!(published(&reconciler), vec!["a"]);
    }

    #[test]
    fn test_failed_send_updates_state() {
        let bus = RecordingBus::new();
        bus.set_failing(true);
        let mut reconciler = Reconciler::default();

        let report = reconciler.reconcile(&[alarm("a", Some("2030-01-01T00:00:00Z"))], &bus);
        assert_eq!(report.failed_sends, 1);
        assert!(reconciler.is_published("a"));

        bus.set_failing(false);
        reconciler.reconcile(&[alarm("a", None)], &bus);
        assert_eq!(bus.calls(), vec![remove("a")]);
        assert!(reconciler.is_empty());
    }

    #[test]
    fn test_clear_is_silent() {
        let bus = RecordingBus::new();
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&[alarm("a", Some("2030-01-01T00:00:00Z"))], &bus);
        bus.take_calls();

        reconciler.clear();

        assert!(reconciler.is_empty());
        assert!(bus.calls().is_empty());
    }
}
