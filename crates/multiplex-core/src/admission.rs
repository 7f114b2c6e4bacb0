//! Admission control for new jobs.
//!
//! A non-blocking counting gate: either a slot is free right now or the
//! submission is refused. The slot is held by the job's background task and
//! returned when the [`AdmissionSlot`] is dropped, after the whole fan-out
//! has concluded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded gate on concurrently processing jobs.
#[derive(Debug)]
pub struct Admission {
    /// `None` means unbounded.
    slots: Option<Arc<Semaphore>>,
    capacity: usize,
    stopped: AtomicBool,
}

/// One admitted job. Dropping it releases the slot.
#[derive(Debug)]
pub struct AdmissionSlot {
    _permit: Option<OwnedSemaphorePermit>,
}

impl Admission {
    /// Create a gate admitting at most `capacity` jobs at once.
    /// A capacity of 0 admits everything until [`stop`](Self::stop).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(Semaphore::MAX_PERMITS);
        let slots = (capacity > 0).then(|| Arc::new(Semaphore::new(capacity)));
        Self {
            slots,
            capacity,
            stopped: AtomicBool::new(false),
        }
    }

    /// Take a slot if one is free. Never waits.
    pub fn try_acquire(&self) -> Option<AdmissionSlot> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }

        match &self.slots {
            None => Some(AdmissionSlot { _permit: None }),
            Some(slots) => Arc::clone(slots)
                .try_acquire_owned()
                .ok()
                .map(|permit| AdmissionSlot {
                    _permit: Some(permit),
                }),
        }
    }

    /// Refuse every later `try_acquire`. Slots already handed out stay valid.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(slots) = &self.slots {
            slots.close();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Number of slots currently held. Always 0 for an unbounded gate.
    pub fn in_use(&self) -> usize {
        match &self.slots {
            None => 0,
            Some(slots) => self.capacity - slots.available_permits(),
        }
    }
}
