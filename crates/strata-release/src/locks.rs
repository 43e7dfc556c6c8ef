//! Per-release-name mutual exclusion
//!
//! Install, update and delete take the lock for their release name before
//! reading any state. A second operation on a busy name is rejected with
//! `ReleaseBusy` rather than queued.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strata_core::{Error, Result};
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct ReleaseLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

impl ReleaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`, failing with `ReleaseBusy` when it is already held
    pub fn try_acquire(&self, name: &str) -> Result<ReleaseGuard> {
        if !self.names().insert(name.to_string()) {
            return Err(Error::ReleaseBusy {
                name: name.to_string(),
            });
        }
        debug!("Acquired release lock for '{}'", name);
        Ok(ReleaseGuard {
            held: Arc::clone(&self.held),
            name: name.to_string(),
        })
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.names().contains(name)
    }

    // A panic while holding the set cannot leave it half-updated.
    fn names(&self) -> MutexGuard<'_, HashSet<String>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the name when dropped
#[derive(Debug)]
pub struct ReleaseGuard {
    held: Arc<Mutex<HashSet<String>>>,
    name: String,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
        debug!("Released release lock for '{}'", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_busy() {
        let locks = ReleaseLocks::new();
        let _guard = locks.try_acquire("r1").unwrap();
        let err = locks.try_acquire("r1").unwrap_err();
        assert!(matches!(err, Error::ReleaseBusy { ref name } if name == "r1"));
        assert!(locks.try_acquire("r2").is_ok());
    }

    #[test]
    fn test_drop_releases_name() {
        let locks = ReleaseLocks::new();
        {
            let _guard = locks.try_acquire("r1").unwrap();
            assert!(locks.is_held("r1"));
        }
        assert!(!locks.is_held("r1"));
        assert!(locks.try_acquire("r1").is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let locks = ReleaseLocks::new();
        let other = locks.clone();
        let _guard = locks.try_acquire("r1").unwrap();
        assert!(other.try_acquire("r1").is_err());
    }
}
