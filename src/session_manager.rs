//! Bounded admission for subprocess-backed requests.
//!
//! The upstream design spawns one subprocess per request with no cap, which
//! is an open resource-exhaustion surface. A semaphore caps concurrent
//! children; at capacity the handler answers 503 instead of spawning.
//!
//! The guard also carries the request's cancellation token. Dropping the
//! guard — response finished, or the client disconnected and axum dropped
//! the body stream — cancels the token, which makes the runner kill its
//! child. Policy choice: a departed client never leaves a subprocess behind.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Caps concurrent completion subprocesses.
pub struct SessionManager {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

/// Releases the admission slot and cancels the request's subprocess on drop.
pub struct SessionGuard {
    cancel: CancellationToken,
    _permit: OwnedSemaphorePermit,
}

impl SessionGuard {
    /// Token the runner watches; cancelled when this guard drops.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl SessionManager {
    pub fn new(max_concurrent: usize) -> Arc<Self> {
        Arc::new(Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        })
    }

    /// Acquire a slot without waiting. Returns `None` at capacity.
    pub fn try_acquire(&self) -> Option<SessionGuard> {
        let permit = self.permits.clone().try_acquire_owned().ok()?;
        Some(SessionGuard {
            cancel: CancellationToken::new(),
            _permit: permit,
        })
    }

    /// Number of requests currently holding a slot.
    pub fn active_count(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn capacity_is_enforced_and_released_on_drop() {
        let mgr = SessionManager::new(2);
        let a = mgr.try_acquire().unwrap();
        let _b = mgr.try_acquire().unwrap();
        assert_eq!(mgr.active_count(), 2);
        assert!(mgr.try_acquire().is_none());

        drop(a);
        assert_eq!(mgr.active_count(), 1);
        assert!(mgr.try_acquire().is_some());
    }

    #[tokio::test]
    async fn dropping_the_guard_cancels_its_token() {
        let mgr = SessionManager::new(1);
        let guard = mgr.try_acquire().unwrap();
        let token = guard.cancellation_token();
        assert!(!token.is_cancelled());
        drop(guard);
        assert!(token.is_cancelled());
    }
}
