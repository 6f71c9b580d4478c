//! Core Components
//!
//! HTTP execution capability and the cancelable request bridge.

pub mod bridge;
pub mod transport;

pub use bridge::*;
pub use transport::*;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
