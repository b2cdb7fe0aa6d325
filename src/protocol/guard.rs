//! Reentrancy guard.
//!
//! One lock flag per engine instance. A workflow takes the flag on entry and
//! the returned `GuardToken` clears it when dropped, so early returns and
//! panics release it as well.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Shared lock flag; clones observe the same flag
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    locked: Arc<AtomicBool>,
}

impl ReentrancyGuard {
    /// Create an unlocked guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock, or fail with `Reentrancy` if a workflow holds it
    pub fn enter(&self) -> Result<GuardToken> {
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Reentrancy)?;

        Ok(GuardToken {
            locked: Arc::clone(&self.locked),
        })
    }

    /// Whether a workflow is executing
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

/// Proof of holding the lock; releases it on drop
#[derive(Debug)]
#[must_use = "the lock is released as soon as the token is dropped"]
pub struct GuardToken {
    locked: Arc<AtomicBool>,
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_entry_rejected() {
        let guard = ReentrancyGuard::new();

        let token = guard.enter().unwrap();
        assert!(guard.is_locked());
        assert_eq!(guard.clone().enter().unwrap_err(), Error::Reentrancy);

        drop(token);
        assert!(!guard.is_locked());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn test_released_on_early_return() {
        fn failing(guard: &ReentrancyGuard) -> Result<()> {
            let _token = guard.enter()?;
            Err(Error::InvalidAmount)
        }

        let guard = ReentrancyGuard::new();
        assert_eq!(failing(&guard), Err(Error::InvalidAmount));
        assert!(!guard.is_locked());
    }
}
