//! Observer registry for detection-state changes.
//!
//! Observers are invoked synchronously on the polling thread, in
//! registration order, with the new smoke state.  A failing or panicking
//! observer is caught and counted; it never stops the observers after it
//! and never reaches the loop.
//!
//! Long-running work belongs behind a [`QueueObserver`], which only
//! forwards the state into a bounded channel.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{error, info};

use crate::error::CallbackError;

/// Callback for detection-state changes.
pub trait Observer: Send {
    fn on_state_change(&mut self, smoke: bool) -> Result<(), CallbackError>;
}

/// Plain closures are observers.  Wrap in [`Fallible`] for closures that
/// can fail.
impl<F> Observer for F
where
    F: FnMut(bool) + Send,
{
    fn on_state_change(&mut self, smoke: bool) -> Result<(), CallbackError> {
        self(smoke);
        Ok(())
    }
}

/// Adapter for closures returning `Result`.
pub struct Fallible<F>(pub F);

impl<F> Observer for Fallible<F>
where
    F: FnMut(bool) -> Result<(), CallbackError> + Send,
{
    fn on_state_change(&mut self, smoke: bool) -> Result<(), CallbackError> {
        (self.0)(smoke)
    }
}

/// Forwards each state change into a bounded channel for another thread.
pub struct QueueObserver {
    tx: SyncSender<bool>,
}

impl QueueObserver {
    pub fn new(tx: SyncSender<bool>) -> Self {
        Self { tx }
    }
}

impl Observer for QueueObserver {
    fn on_state_change(&mut self, smoke: bool) -> Result<(), CallbackError> {
        match self.tx.try_send(smoke) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                Err(CallbackError::QueueUnavailable)
            }
        }
    }
}

type SharedObserver = Arc<Mutex<dyn Observer>>;

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Shared, ordered list of observers.  Clones share the same list, so the
/// detector handle can register observers while the loop is running.
///
/// The list lock is held only to register or to snapshot the list, never
/// while a callback runs.  A callback may register further observers,
/// which are first invoked on the next notification.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    observers: Arc<Mutex<Vec<SharedObserver>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: impl Observer + 'static) {
        let mut list = lock(&self.observers);
        list.push(Arc::new(Mutex::new(observer)));
        info!("New callback registered. Total callbacks: {}", list.len());
    }

    pub fn len(&self) -> usize {
        lock(&self.observers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every observer in registration order.  Returns the failures,
    /// already logged, in invocation order.
    pub fn notify(&self, smoke: bool) -> Vec<CallbackError> {
        let snapshot: Vec<SharedObserver> = lock(&self.observers).iter().cloned().collect();

        let mut failures = Vec::new();
        for (idx, observer) in snapshot.iter().enumerate() {
            let mut observer = lock(&**observer);
            let result = catch_unwind(AssertUnwindSafe(|| observer.on_state_change(smoke)))
                .unwrap_or(Err(CallbackError::Panicked));
            if let Err(e) = result {
                error!("Error in callback #{}: {}", idx, e);
                failures.push(e);
            }
        }
        failures
    }
}
