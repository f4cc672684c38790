//! Fault injection shared by the in-memory collaborators.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::error::CollaboratorError;

/// Error and latency injected into one collaborator operation.
#[derive(Debug, Clone, Default)]
pub(crate) struct Fault {
    pub(crate) error: Option<CollaboratorError>,
    pub(crate) delay: Option<Duration>,
}

impl Fault {
    /// Sleeps for the configured delay, then returns the configured error.
    pub(crate) async fn inject(self) -> Result<(), CollaboratorError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_inject_waits_then_fails() {
        let fault = Fault {
            error: Some(CollaboratorError::Unavailable("down".to_string())),
            delay: Some(Duration::from_millis(300)),
        };
        let started = tokio::time::Instant::now();
        let result = fault.inject().await;
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(
            result,
            Err(CollaboratorError::Unavailable("down".to_string()))
        );
    }

    #[tokio::test]
    async fn test_default_fault_is_a_no_op() {
        assert!(Fault::default().inject().await.is_ok());
    }
}
