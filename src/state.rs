//! The six-state lifecycle every externally visible transition routes
//! through.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// One of the six states an instance can be in. `Copy + Eq` so callers
/// can compare against the exposed constants by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientState {
    Created = 0,
    Requesting = 1,
    Cancelling = 2,
    Fulfilled = 3,
    Cancelled = 4,
    Failed = 5,
}

impl ClientState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ClientState::Fulfilled | ClientState::Cancelled | ClientState::Failed
        )
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ClientState::Created,
            1 => ClientState::Requesting,
            2 => ClientState::Cancelling,
            3 => ClientState::Fulfilled,
            4 => ClientState::Cancelled,
            5 => ClientState::Failed,
            _ => unreachable!("invalid client state byte"),
        }
    }
}

/// Shared, synchronously-observable state cell. Driven exclusively from
/// inside the driver's single task; read from anywhere via `state()`.
#[derive(Debug, Clone)]
pub struct StateCell {
    inner: Arc<AtomicU8>,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(ClientState::Created as u8)),
        }
    }

    pub fn get(&self) -> ClientState {
        ClientState::from_u8(self.inner.load(Ordering::SeqCst))
    }

    /// Atomically move from `from` to `to`, returning whether the
    /// transition actually happened. Fails silently if the current
    /// state isn't `from` — callers decide what that means (usually a
    /// `StateError`).
    pub fn try_transition(&self, from: ClientState, to: ClientState) -> bool {
        self.inner
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Unconditionally set the terminal state. Only ever called once,
    /// from teardown.
    pub fn set(&self, to: ClientState) {
        self.inner.store(to as u8, Ordering::SeqCst);
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
