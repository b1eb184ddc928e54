//! Admission control for blocking operation work.
//!
//! Every admitted call holds an [`OperationPermit`] for as long as its handler
//! runs on the blocking pool. The permit lives inside the blocking task, not in
//! the caller's future, so a caller that stops waiting (timeout, disconnect)
//! does not free a slot while the work is still running.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use super::operation::OperationError;

/// Shared pool of execution slots. Clones share the same slots.
#[derive(Debug, Clone)]
pub struct OperationPermits {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

/// A held execution slot; released on drop.
#[derive(Debug)]
pub struct OperationPermit {
    _slot: OwnedSemaphorePermit,
}

impl OperationPermits {
    #[must_use]
    pub fn new(limit: u32) -> Self {
        let limit = limit as usize;
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Claims a slot for `operation` without waiting.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Overloaded` when every slot is held.
    pub fn try_admit(&self, operation: &str) -> Result<OperationPermit, OperationError> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(slot) => Ok(OperationPermit { _slot: slot }),
            Err(_) => {
                warn!(
                    operation,
                    limit = self.limit,
                    "all operation slots busy, shedding call"
                );
                Err(OperationError::Overloaded)
            }
        }
    }

    /// Operations currently holding a slot.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}
