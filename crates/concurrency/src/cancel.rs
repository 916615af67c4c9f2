//! Commit cancellation
//!
//! A [`CancellationToken`] is checked before each change executes. Once
//! it is cancelled or past its deadline, the next change fails with
//! [`StateError::Cancelled`] and the commit rolls back.

use statecraft_core::StateError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag with an optional deadline
///
/// Clones share the flag, so a token handed to a commit can be cancelled
/// from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Token that only trips when cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also trips once `timeout` has elapsed
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// This token, additionally bounded by `timeout` from now
    ///
    /// Keeps the earlier of the two deadlines and shares the flag.
    pub fn bounded_by(&self, timeout: Duration) -> Self {
        let candidate = Instant::now().checked_add(timeout);
        let deadline = match (self.deadline, candidate) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline,
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) was called
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the deadline has passed
    pub fn is_expired(&self) -> bool {
        self.deadline.map_or(false, |d| Instant::now() >= d)
    }

    /// `Err(Cancelled)` once cancelled or expired
    pub fn check(&self) -> Result<(), StateError> {
        if self.is_cancelled() {
            Err(StateError::Cancelled {
                reason: "commit cancelled".to_string(),
            })
        } else if self.is_expired() {
            Err(StateError::Cancelled {
                reason: "commit deadline expired".to_string(),
            })
        } else {
            Ok(())
        }
    }
}
