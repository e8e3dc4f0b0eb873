//! Bounded admission for directory enumeration.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use dirscope_core::ScanError;

/// Counting gate capping how many directories are enumerated at once.
///
/// The gate bounds simultaneous enumeration only. A directory waiting on its
/// children must not hold a permit.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyGate {
    /// Create a gate sized from the available hardware parallelism.
    pub fn new() -> Self {
        Self::with_capacity(Self::default_capacity())
    }

    /// Create a gate with an explicit capacity (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Twice the number of available processing units.
    pub fn default_capacity() -> usize {
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
            * 2
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of free slots right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a free slot, or fail with [`ScanError::Cancelled`] once the
    /// token fires. Only the calling task is suspended.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<GatePermit, ScanError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScanError::Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit
                .map(|permit| GatePermit { _permit: permit })
                // The semaphore is never closed; treat it as a shutdown.
                .map_err(|_| ScanError::Cancelled),
        }
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new()
    }
}

/// A held gate slot. Dropping it returns the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_capacity_is_even_and_positive() {
        let capacity = ConcurrencyGate::default_capacity();
        assert!(capacity >= 2);
        assert_eq!(capacity % 2, 0);
        assert_eq!(ConcurrencyGate::new().capacity(), capacity);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(ConcurrencyGate::with_capacity(0).capacity(), 1);
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let gate = ConcurrencyGate::with_capacity(2);
        let token = CancellationToken::new();

        let first = gate.acquire(&token).await.unwrap();
        let second = gate.acquire(&token).await.unwrap();
        assert_eq!(gate.available(), 0);

        drop(first);
        assert_eq!(gate.available(), 1);
        drop(second);
        assert_eq!(gate.available(), 2);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let gate = ConcurrencyGate::with_capacity(1);
        let token = CancellationToken::new();
        let held = gate.acquire(&token).await.unwrap();

        let waiter = {
            let gate = gate.clone();
            let token = token.clone();
            tokio::spawn(async move { gate.acquire(&token).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap().unwrap();
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let gate = ConcurrencyGate::with_capacity(1);
        let token = CancellationToken::new();
        let _held = gate.acquire(&token).await.unwrap();

        let waiter = {
            let gate = gate.clone();
            let token = token.clone();
            tokio::spawn(async move { gate.acquire(&token).await.map(|_| ()) })
        };

        token.cancel();
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(ScanError::Cancelled)));
    }

    #[tokio::test]
    async fn test_already_cancelled_wins_over_free_slot() {
        let gate = ConcurrencyGate::with_capacity(4);
        let token = CancellationToken::new();
        token.cancel();

        assert!(gate.acquire(&token).await.is_err());
        assert_eq!(gate.available(), 4);
    }
}
