//! Reentrancy guard
//!
//! Held for the duration of any call into an external capability (multisig
//! backend, staking initializer). The token releases the guard when dropped,
//! so early returns and `?` propagation can never leave it locked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Scoped lock rejecting nested entry.
#[derive(Clone, Debug, Default)]
pub struct ReentrancyGuard {
    locked: Arc<AtomicBool>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard. `None` if it is already held.
    pub fn enter(&self) -> Option<GuardToken> {
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GuardToken {
                locked: Arc::clone(&self.locked),
            })
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

/// Proof that the guard is held. Releases on drop.
#[derive(Debug)]
pub struct GuardToken {
    locked: Arc<AtomicBool>,
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.locked.store(false, Ordering::Release);
    }
}
