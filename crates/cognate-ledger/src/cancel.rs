use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::LedgerError;

/// Entries processed between cancellation checks.
pub(crate) const CHECK_INTERVAL: usize = 256;

/// Cooperative cancellation for long reads (`verify`, `query`).
///
/// Clones share the same flag, so a caller can keep one handle and cancel a
/// read running on another thread. An optional deadline cancels the read
/// once it passes.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that only trips when [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also trips once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub(crate) fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::new, Self::with_timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// `Err(Cancelled)` once the token has tripped.
    pub fn check(&self) -> Result<(), LedgerError> {
        if self.is_cancelled() {
            Err(LedgerError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Check only every [`CHECK_INTERVAL`] items.
    pub(crate) fn checkpoint(&self, processed: usize) -> Result<(), LedgerError> {
        if processed % CHECK_INTERVAL == 0 {
            self.check()
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_live() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let handle = token.clone();
        handle.cancel();
        assert_eq!(token.check(), Err(LedgerError::Cancelled));
    }

    #[test]
    fn elapsed_deadline_cancels() {
        let token = CancelToken::with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());
    }

    #[test]
    fn checkpoint_only_checks_on_interval() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.checkpoint(1).is_ok());
        assert!(token.checkpoint(CHECK_INTERVAL).is_err());
    }
}
