//! Inbound settings store abstraction.

use crate::error::EnvError;
use crate::types::AlarmSnapshot;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// The user-owned store holding the configured clock alarms.
///
/// # Notification Flow
///
/// ```text
/// Store                     Subscription                 Agent
///   |                            |                          |
///   |-- alarms changed --------->|                          |
///   |                            |-- changed() -> true ---->|
///   |<----------------------------------- get_alarms() -----|
/// ```
///
/// Notifications carry no payload and may be spurious or repeated; the
/// consumer always re-reads the whole list.
pub trait SettingsSource: Send + Sync + 'static {
    /// Returns the current alarm list, or `None` if the store is empty or
    /// unreadable.
    fn get_alarms(&self) -> Option<AlarmSnapshot>;

    /// Registers interest in change notifications.
    ///
    /// Delivery lasts as long as the returned [`Subscription`] lives.
    fn subscribe(&self) -> Result<Subscription, EnvError>;
}

/// Receiving end of a settings change registration.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<()>,
}

impl Subscription {
    /// Waits for the next change notification.
    ///
    /// Returns `false` once the source has gone away.
    pub async fn changed(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }

    /// Consumes every notification already queued, without waiting.
    ///
    /// Returns how many were pending.
    pub fn drain(&mut self) -> usize {
        let mut pending = 0;
        while self.rx.try_recv().is_ok() {
            pending += 1;
        }
        pending
    }
}

/// Fan-out helper for sources: hands out subscriptions and signals them.
#[derive(Debug, Clone, Default)]
pub struct ChangeNotifier {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<()>>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new subscription.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        Subscription { rx }
    }

    /// Signals every live subscription. Dropped subscriptions are pruned.
    ///
    /// Returns the number of subscriptions notified.
    pub fn notify(&self) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| tx.send(()).is_ok());
        subscribers.len()
    }

    /// Number of subscriptions still alive.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// Ends every subscription: pending notifications are still
    /// delivered, then `changed()` returns `false`.
    pub fn close(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<()>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
