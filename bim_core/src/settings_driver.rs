//! Settings driver - reconciles the bus against the settings store.

use crate::driver::{AlarmDriver, DriverKind};
use crate::error::AgentError;
use crate::reconciler::{PassReport, Reconciler};
use async_trait::async_trait;
use bim_env::{BusSink, SettingsSource, Subscription};
use std::sync::Arc;
use tracing::{debug, info};

/// Follows a [`SettingsSource`] and runs a reconciliation pass per change.
///
/// Notifications that pile up while a pass runs are folded into the next
/// pass: every pass reads the current list, and a repeated pass over the
/// same list emits nothing.
pub struct SettingsDriver<Src: SettingsSource> {
    source: Arc<Src>,
    subscription: Option<Subscription>,
}

impl<Src: SettingsSource> SettingsDriver<Src> {
    pub fn new(source: Arc<Src>) -> Self {
        Self {
            source,
            subscription: None,
        }
    }

    /// True while subscribed to the source.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Reads the current list and reconciles against it.
    ///
    /// A source with nothing to offer makes this a no-op.
    pub fn reconcile_now(&self, reconciler: &mut Reconciler, bus: &dyn BusSink) -> PassReport {
        match self.source.get_alarms() {
            Some(snapshot) => {
                let report = reconciler.reconcile(&snapshot, bus);
                debug!(
                    "Pass over {} records: +{} -{} skipped={} failed={}",
                    snapshot.len(),
                    report.added,
                    report.removed,
                    report.skipped,
                    report.failed_sends
                );
                report
            }
            None => {
                debug!("No alarm list available, nothing to reconcile");
                PassReport::default()
            }
        }
    }
}

#[async_trait]
impl<Src: SettingsSource> AlarmDriver for SettingsDriver<Src> {
    fn kind(&self) -> DriverKind {
        DriverKind::Settings
    }

    fn start(&mut self, reconciler: &mut Reconciler, bus: &dyn BusSink) -> Result<(), AgentError> {
        if self.subscription.is_some() {
            return Err(AgentError::AlreadyStarted);
        }
        let subscription = self.source.subscribe().map_err(AgentError::Subscribe)?;
        self.subscription = Some(subscription);
        self.reconcile_now(reconciler, bus);
        Ok(())
    }

    fn process_pending(&mut self, reconciler: &mut Reconciler, bus: &dyn BusSink) -> usize {
        let pending = match self.subscription.as_mut() {
            Some(subscription) => subscription.drain(),
            None => return 0,
        };
        if pending > 0 {
            self.reconcile_now(reconciler, bus);
        }
        pending
    }

    async fn run(&mut self, reconciler: &mut Reconciler, bus: &dyn BusSink) -> Result<(), AgentError> {
        loop {
            let subscription = self.subscription.as_mut().ok_or(AgentError::NotStarted)?;
            if !subscription.changed().await {
                info!("Settings source closed");
                return Ok(());
            }
            let coalesced = subscription.drain();
            if coalesced > 0 {
                debug!("Folded {} extra change notifications", coalesced);
            }
            self.reconcile_now(reconciler, bus);
        }
    }

    fn stop(&mut self) {
        self.subscription = None;
    }
}
