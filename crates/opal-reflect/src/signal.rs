//! Mutation-notification signals
//!
//! Each property descriptor owns explicit observer lists instead of a
//! global signal framework. Observers run synchronously in connection
//! order; an observer returning an error stops the emission and the error
//! propagates to the caller of the mutating operation, vetoing the pending
//! mutation when the signal fires pre-mutation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;

/// Identifies one connected observer for later disconnection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

type Slot<E> = Arc<dyn Fn(&E) -> Result<()> + Send + Sync>;

/// Synchronous multi-subscriber observer list
pub struct Signal<E> {
    slots: RwLock<Vec<(SlotId, Slot<E>)>>,
    next_id: AtomicU64,
}

impl<E> Signal<E> {
    /// Signal with no observers
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Connect an observer; the returned id disconnects it again
    pub fn connect<F>(&self, observer: F) -> SlotId
    where
        F: Fn(&E) -> Result<()> + Send + Sync + 'static,
    {
        let id = SlotId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots.write().push((id, Arc::new(observer)));
        id
    }

    /// Disconnect an observer; returns false if the id was not connected
    pub fn disconnect(&self, id: SlotId) -> bool {
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id);
        slots.len() != before
    }

    /// Number of connected observers
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// True when nothing is connected
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Invoke every observer in connection order, stopping at the first
    /// error
    ///
    /// The slot list is snapshotted before invocation so observers may
    /// connect or disconnect without deadlocking.
    pub fn emit(&self, event: &E) -> Result<()> {
        let snapshot: Vec<Slot<E>> = self.slots.read().iter().map(|(_, s)| Arc::clone(s)).collect();
        for slot in snapshot {
            slot(event)?;
        }
        Ok(())
    }
}

impl<E> Default for Signal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Signal<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").field("slots", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_in_connection_order() {
        let signal: Signal<i64> = Signal::new();
        let log = Arc::new(RwLock::new(Vec::new()));

        let first = Arc::clone(&log);
        signal.connect(move |v| {
            first.write().push(*v);
            Ok(())
        });
        let second = Arc::clone(&log);
        signal.connect(move |v| {
            second.write().push(v * 10);
            Ok(())
        });

        signal.emit(&3).unwrap();
        assert_eq!(*log.read(), vec![3, 30]);
    }

    #[test]
    fn test_disconnect() {
        let signal: Signal<()> = Signal::new();
        let count = Arc::new(AtomicUsize::new(0));

        let observed = Arc::clone(&count);
        let id = signal.connect(move |()| {
            observed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });

        signal.emit(&()).unwrap();
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(&()).unwrap();

        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_error_stops_emission() {
        let signal: Signal<()> = Signal::new();
        let reached = Arc::new(AtomicUsize::new(0));

        signal.connect(|()| Err(Error::NullObject));
        let observed = Arc::clone(&reached);
        signal.connect(move |()| {
            observed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });

        assert_eq!(signal.emit(&()), Err(Error::NullObject));
        assert_eq!(reached.load(Ordering::Relaxed), 0);
    }
}
