//! Transport ownership
//!
//! A single-holder token guards the transport between the command path and
//! the background drain. Acquisition is deadline-bounded and release always
//! happens on guard drop, so no code path can forget it.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use crate::error::Hc15Error;

/// Single-holder permit over the transport
#[derive(Debug)]
pub struct TransportLock<T> {
    inner: Mutex<T>,
}

impl<T> TransportLock<T> {
    /// Place a transport behind the permit
    pub fn new(transport: T) -> Self {
        Self {
            inner: Mutex::new(transport),
        }
    }

    /// Wait up to `wait` for exclusive ownership
    ///
    /// Expiry maps to [`Hc15Error::LockTimeout`]; the caller decides whether
    /// that is an error or a skipped turn.
    pub async fn acquire(&self, wait: Duration) -> Result<TransportGuard<'_, T>, Hc15Error> {
        match tokio::time::timeout(wait, self.inner.lock()).await {
            Ok(guard) => Ok(TransportGuard { guard }),
            Err(_) => Err(Hc15Error::LockTimeout(wait)),
        }
    }
}

/// Exclusive ownership of the transport, released on drop
#[derive(Debug)]
pub struct TransportGuard<'a, T> {
    guard: MutexGuard<'a, T>,
}

impl<T> Deref for TransportGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for TransportGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
