//! # BinarySignal: async-observable boolean flag.
//!
//! A [`BinarySignal`] holds one boolean and a list of pending waiters, each
//! waiting for a specific target value.
//!
//! ## Architecture
//! ```text
//! wait(target) ──► value == target? ──yes──► return immediately
//!                        │
//!                        no
//!                        ▼
//!               register Waiter{target, oneshot} (under lock)
//!                        │
//! emit(value) ──► lock ──► value = v ──► drain waiters with target == v ──► send(())
//! ```
//!
//! ## Rules
//! - Registration and transition happen under the same lock, so a waiter that
//!   registered before a transition is always woken by it.
//! - A quick `set(); clear()` wakes both a pending `wait(true)` and a pending
//!   `wait(false)`: waiters are matched against each transition, not against
//!   the value observed later.
//! - One transition releases every waiter on that target.
//! - The base [`wait`](BinarySignal::wait) never times out; bounded waiting goes
//!   through [`wait_cancellable`](BinarySignal::wait_cancellable) or
//!   [`wait_timeout`](BinarySignal::wait_timeout).
//! - Waiters abandoned by a cancelled or timed-out wait are pruned lazily.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Reason a bounded wait returned before the signal reached its target.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// The cancellation token fired first.
    #[error("wait cancelled")]
    Cancelled,

    /// The timer fired first.
    #[error("wait timed out after {timeout:?}")]
    Elapsed {
        /// The timeout that was exceeded.
        timeout: Duration,
    },
}

struct Waiter {
    target: bool,
    tx: oneshot::Sender<()>,
}

struct State {
    value: bool,
    waiters: Vec<Waiter>,
}

/// Async-observable boolean flag.
///
/// ### Example
/// ```rust
/// use conductor::BinarySignal;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let signal = BinarySignal::new(false);
/// signal.set();
/// // Already true: returns without suspending.
/// signal.wait(true).await;
/// assert!(signal.is_set());
/// # }
/// ```
pub struct BinarySignal {
    state: Mutex<State>,
}

impl BinarySignal {
    /// Creates a signal holding `default`.
    pub fn new(default: bool) -> Self {
        Self {
            state: Mutex::new(State {
                value: default,
                waiters: Vec::new(),
            }),
        }
    }

    /// Returns the current value.
    pub fn is_set(&self) -> bool {
        self.lock().value
    }

    /// Assigns `true` and wakes every waiter targeting `true`.
    pub fn set(&self) {
        self.emit(true);
    }

    /// Assigns `false` and wakes every waiter targeting `false`.
    pub fn clear(&self) {
        self.emit(false);
    }

    /// Assigns `value` and wakes every waiter whose target matches it.
    pub fn emit(&self, value: bool) {
        let ready: Vec<Waiter> = {
            let mut state = self.lock();
            state.value = value;
            let (ready, pending) = std::mem::take(&mut state.waiters)
                .into_iter()
                .filter(|w| !w.tx.is_closed())
                .partition(|w| w.target == value);
            state.waiters = pending;
            ready
        };

        for waiter in ready {
            let _ = waiter.tx.send(());
        }
    }

    /// Suspends until the value equals `target`.
    ///
    /// Returns immediately when it already does.
    pub async fn wait(&self, target: bool) {
        if let Some(rx) = self.register(target) {
            // The sender lives in `self`, which outlives this borrow.
            let _ = rx.await;
        }
    }

    /// Like [`wait`](Self::wait), but gives up when `cancel` fires.
    ///
    /// A signal that already holds `target` wins over an already-cancelled token.
    pub async fn wait_cancellable(
        &self,
        target: bool,
        cancel: &CancellationToken,
    ) -> Result<(), WaitError> {
        let Some(rx) = self.register(target) else {
            return Ok(());
        };

        tokio::select! {
            biased;
            _ = rx => Ok(()),
            _ = cancel.cancelled() => Err(WaitError::Cancelled),
        }
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`.
    pub async fn wait_timeout(&self, target: bool, timeout: Duration) -> Result<(), WaitError> {
        let Some(rx) = self.register(target) else {
            return Ok(());
        };

        tokio::time::timeout(timeout, rx)
            .await
            .map(|_| ())
            .map_err(|_| WaitError::Elapsed { timeout })
    }

    /// Registers a waiter for `target`, or returns `None` when the value already matches.
    fn register(&self, target: bool) -> Option<oneshot::Receiver<()>> {
        let mut state = self.lock();
        if state.value == target {
            return None;
        }

        state.waiters.retain(|w| !w.tx.is_closed());
        let (tx, rx) = oneshot::channel();
        state.waiters.push(Waiter { target, tx });
        Some(rx)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.lock().waiters.len()
    }
}

impl Default for BinarySignal {
    /// A cleared signal.
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Debug for BinarySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("BinarySignal")
            .field("value", &state.value)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_wait_on_matching_value_returns_immediately() {
        let signal = BinarySignal::new(false);
        signal.set();
        signal.wait(true).await;
        signal.clear();
        signal.wait(false).await;
        assert_eq!(signal.pending(), 0);
    }

    #[tokio::test]
    async fn test_transition_after_registration_is_never_missed() {
        let signal = BinarySignal::new(true);

        let wait_false = signal.wait(false);
        tokio::pin!(wait_false);
        assert!(futures::poll!(&mut wait_false).is_pending());

        signal.set();
        signal.clear();
        signal.set();

        // The value is `true` again, but the waiter saw the `false` transition.
        wait_false.await;
        assert!(signal.is_set());
    }

    #[tokio::test]
    async fn test_rapid_flip_wakes_both_targets() {
        let signal = BinarySignal::new(false);
        signal.clear();

        let wait_true = signal.wait(true);
        tokio::pin!(wait_true);
        assert!(futures::poll!(&mut wait_true).is_pending());

        signal.set();
        signal.clear();
        wait_true.await;
        assert!(!signal.is_set());
    }

    #[tokio::test]
    async fn test_one_transition_releases_all_waiters() {
        let signal = Arc::new(BinarySignal::new(false));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let s = Arc::clone(&signal);
            handles.push(tokio::spawn(async move { s.wait(true).await }));
        }

        while signal.pending() < 8 {
            tokio::task::yield_now().await;
        }
        signal.set();

        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(signal.pending(), 0);
    }

    #[tokio::test]
    async fn test_waiters_on_other_target_stay_pending() {
        let signal = BinarySignal::new(false);

        let wait_true = signal.wait(true);
        tokio::pin!(wait_true);
        assert!(futures::poll!(&mut wait_true).is_pending());

        signal.clear();
        assert!(futures::poll!(&mut wait_true).is_pending());
        assert_eq!(signal.pending(), 1);
    }

    #[tokio::test]
    async fn test_wait_cancellable_returns_cancelled() {
        let signal = BinarySignal::new(false);
        let token = CancellationToken::new();
        token.cancel();

        let res = signal.wait_cancellable(true, &token).await;
        assert_eq!(res, Err(WaitError::Cancelled));
    }

    #[tokio::test]
    async fn test_wait_cancellable_prefers_matching_value() {
        let signal = BinarySignal::new(true);
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(signal.wait_cancellable(true, &token).await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_elapses() {
        let signal = BinarySignal::new(false);
        let timeout = Duration::from_millis(250);

        let res = signal.wait_timeout(true, timeout).await;
        assert_eq!(res, Err(WaitError::Elapsed { timeout }));
    }

    #[tokio::test]
    async fn test_abandoned_waiters_are_pruned() {
        let signal = BinarySignal::new(false);
        let token = CancellationToken::new();
        token.cancel();

        let _ = signal.wait_cancellable(true, &token).await;
        assert_eq!(signal.pending(), 1);

        signal.clear();
        assert_eq!(signal.pending(), 0);
    }
}
