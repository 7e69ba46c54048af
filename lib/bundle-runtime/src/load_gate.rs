use tokio::sync::{Semaphore, SemaphorePermit};

/// Single-flight gate serializing every low-level bundle load.
///
/// The gate is global to a registry, not per bundle: loads of two unrelated
/// bundles never overlap. Holding a [`LoadPermit`] is the only way to read a
/// bundle from storage; dropping it reopens the gate.
pub struct LoadGate {
    semaphore: Semaphore,
}

/// Proof of ownership of the [`LoadGate`]. Releases the gate on drop.
pub struct LoadPermit<'a> {
    _permit: SemaphorePermit<'a>,
}

impl Default for LoadGate {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self {
            semaphore: Semaphore::new(1),
        }
    }

    /// Waits for the gate to open and claims it.
    pub async fn acquire(&self) -> LoadPermit<'_> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .expect("load gate is never closed");
        LoadPermit { _permit: permit }
    }

    /// Claims the gate if it is open.
    pub fn try_acquire(&self) -> Option<LoadPermit<'_>> {
        self.semaphore
            .try_acquire()
            .ok()
            .map(|permit| LoadPermit { _permit: permit })
    }

    /// Returns true while a load holds the gate.
    pub fn is_held(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}
